use indexmap::IndexMap;

/// Job inheritance drawn as an ASCII tree, ancestors above descendants.
///
/// ```text
/// base
/// |-- tox
/// |   +-- tox-py311
/// +-- pep8
/// ```
pub struct HierarchyTree<'a> {
    parents: &'a IndexMap<String, Vec<String>>,
}

impl<'a> HierarchyTree<'a> {
    pub fn new(parents: &'a IndexMap<String, Vec<String>>) -> Self {
        Self { parents }
    }

    /// Jobs inheriting from nothing known, in the order they were first met.
    fn roots(&self) -> Vec<&'a str> {
        let mut roots: Vec<&'a str> = Vec::new();

        let nodes = self
            .parents
            .iter()
            .flat_map(|(job, parents)| std::iter::once(job).chain(parents));

        for node in nodes {
            let orphan = self.parents.get(node).map_or(true, Vec::is_empty);
            if orphan && !roots.contains(&node.as_str()) {
                roots.push(node);
            }
        }

        roots
    }

    fn children(&self, node: &str) -> Vec<&'a str> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.iter().any(|parent| parent == node))
            .map(|(job, _)| job.as_str())
            .collect()
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();

        for root in self.roots() {
            lines.push(root.to_string());
            let mut path = vec![root];
            self.render_children(root, "", &mut path, &mut lines);
        }

        lines
    }

    fn render_children(
        &self,
        node: &'a str,
        prefix: &str,
        path: &mut Vec<&'a str>,
        lines: &mut Vec<String>,
    ) {
        let children: Vec<&'a str> = self
            .children(node)
            .into_iter()
            .filter(|child| !path.contains(child))
            .collect();

        for (i, &child) in children.iter().enumerate() {
            let (branch, indent) = if i + 1 == children.len() {
                ("+-- ", "    ")
            } else {
                ("|-- ", "|   ")
            };

            lines.push(format!("{prefix}{branch}{child}"));
            path.push(child);
            self.render_children(child, &format!("{prefix}{indent}"), path, lines);
            path.pop();
        }
    }
}
