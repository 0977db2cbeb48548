use async_trait::async_trait;
use indexmap::IndexMap;
use log::debug;

use crate::error::Result;

use super::api::{
    BuildQuery, BuildRef, BuildSource, JobRef, JobSource, PipelineRef, PipelineSource,
    ProjectRef, ProjectSource, TenantRef, TenantSource, VariantRef, VariantSource,
};
use super::client::{SessionSettings, ZuulSession};
use super::types::{RawBuild, RawJob, RawProject, RawProjectDetail, RawTenant, RawVariant};

/// Zuul deployment reached through its REST API.
pub struct ZuulRestClient {
    session: ZuulSession,
}

impl ZuulRestClient {
    pub fn new(session: ZuulSession) -> Self {
        Self { session }
    }

    pub fn from_settings(settings: SessionSettings) -> Result<Self> {
        Ok(Self::new(ZuulSession::new(settings)?))
    }
}

#[async_trait]
impl TenantSource for ZuulRestClient {
    async fn tenants(&self) -> Result<Vec<TenantRef>> {
        let tenants: Vec<RawTenant> = self.session.get(&["tenants"], &[]).await?;

        Ok(tenants
            .into_iter()
            .map(|tenant| TenantRef::new(tenant.name))
            .collect())
    }
}

#[async_trait]
impl ProjectSource for ZuulRestClient {
    async fn projects(&self, tenant: &TenantRef) -> Result<Vec<ProjectRef>> {
        let projects: Vec<RawProject> = self
            .session
            .get(&["tenant", &tenant.name, "projects"], &[])
            .await?;

        Ok(projects
            .into_iter()
            .map(|project| ProjectRef {
                tenant: tenant.clone(),
                name: project.name,
            })
            .collect())
    }

    fn project_url(&self, project: &ProjectRef) -> Option<String> {
        Some(format!(
            "{}/t/{}/project/{}",
            self.session.host(),
            project.tenant.name,
            project.name
        ))
    }
}

#[async_trait]
impl PipelineSource for ZuulRestClient {
    async fn pipelines(&self, project: &ProjectRef) -> Result<Vec<PipelineRef>> {
        let detail: RawProjectDetail = self
            .session
            .get(&["tenant", &project.tenant.name, "project", &project.name], &[])
            .await?;

        // Each config block carries its own share of pipelines; a pipeline
        // named in several blocks is one pipeline.
        let mut pipelines: IndexMap<String, Vec<String>> = IndexMap::new();

        for config in detail.configs {
            for pipeline in config.pipelines {
                let job_names = pipelines.entry(pipeline.name).or_default();

                for variants in pipeline.jobs {
                    for variant in variants {
                        if !job_names.contains(&variant.name) {
                            job_names.push(variant.name);
                        }
                    }
                }
            }
        }

        debug!(
            "Project '{}' declares {} pipelines",
            project.name,
            pipelines.len()
        );

        Ok(pipelines
            .into_iter()
            .map(|(name, job_names)| PipelineRef {
                project: project.clone(),
                name,
                job_names,
            })
            .collect())
    }
}

#[async_trait]
impl JobSource for ZuulRestClient {
    async fn jobs(&self, tenant: &TenantRef) -> Result<Vec<JobRef>> {
        let jobs: Vec<RawJob> = self
            .session
            .get(&["tenant", &tenant.name, "jobs"], &[])
            .await?;

        Ok(jobs
            .into_iter()
            .map(|job| JobRef::new(tenant, job.name))
            .collect())
    }

    fn job_url(&self, job: &JobRef) -> Option<String> {
        Some(format!(
            "{}/t/{}/job/{}",
            self.session.host(),
            job.tenant.name,
            job.name
        ))
    }
}

#[async_trait]
impl VariantSource for ZuulRestClient {
    async fn variants(&self, job: &JobRef) -> Result<Vec<VariantRef>> {
        let variants: Vec<RawVariant> = self
            .session
            .get(&["tenant", &job.tenant.name, "job", &job.name], &[])
            .await?;

        Ok(variants
            .into_iter()
            .map(|raw| VariantRef {
                job: job.clone(),
                raw,
            })
            .collect())
    }
}

#[async_trait]
impl BuildSource for ZuulRestClient {
    async fn builds(&self, job: &JobRef, query: &BuildQuery) -> Result<Vec<BuildRef>> {
        let mut params = vec![("job_name", job.name.as_str())];
        params.extend(query.results.iter().map(|r| ("result", r.as_str())));

        let builds: Vec<RawBuild> = self
            .session
            .get(&["tenant", &job.tenant.name, "builds"], &params)
            .await?;

        Ok(builds
            .into_iter()
            .map(|raw| BuildRef {
                job: job.clone(),
                raw,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CITreeError, RemoteErrorKind};
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> ZuulRestClient {
        ZuulRestClient::from_settings(SessionSettings::new(server.url())).unwrap()
    }

    #[tokio::test]
    async fn lists_tenants() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tenants")
            .with_body(r#"[{"name": "openstack", "projects": 12}, {"name": "zuul"}]"#)
            .create_async()
            .await;

        let tenants = client(&server).tenants().await.unwrap();
        let names: Vec<_> = tenants.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["openstack", "zuul"]);
    }

    #[tokio::test]
    async fn lists_tenant_projects() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tenant/openstack/projects")
            .with_body(
                r#"[
                    {"name": "openstack/nova", "type": "untrusted"},
                    {"name": "openstack/neutron", "connection_name": "opendev"}
                ]"#,
            )
            .create_async()
            .await;

        let tenant = TenantRef::new("openstack");
        let projects = client(&server).projects(&tenant).await.unwrap();

        mock.assert_async().await;
        let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["openstack/nova", "openstack/neutron"]);
        assert!(projects.iter().all(|p| p.tenant == tenant));
    }

    #[tokio::test]
    async fn lists_tenant_jobs() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tenant/openstack/jobs")
            .with_body(
                r#"[
                    {"name": "base", "description": "The base job"},
                    {"name": "tox-py3", "variants": [{"parent": "tox"}]}
                ]"#,
            )
            .create_async()
            .await;

        let tenant = TenantRef::new("openstack");
        let jobs = client(&server).jobs(&tenant).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            jobs,
            vec![JobRef::new(&tenant, "base"), JobRef::new(&tenant, "tox-py3")]
        );
    }

    #[tokio::test]
    async fn unusual_names_stay_inside_their_segment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tenant/open%3Fstack/jobs")
            .with_body("[]")
            .create_async()
            .await;

        let jobs = client(&server)
            .jobs(&TenantRef::new("open?stack"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn pipelines_from_all_configs_are_combined() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tenant/openstack/project/nova")
            .with_body(
                r#"{"configs": [
                    {"pipelines": [
                        {"name": "check", "jobs": [[{"name": "tox-py3"}, {"name": "tox-py3"}], [{"name": "pep8"}]]}
                    ]},
                    {"pipelines": [
                        {"name": "check", "jobs": [[{"name": "grenade"}]]},
                        {"name": "gate", "jobs": [[{"name": "tox-py3"}]]}
                    ]}
                ]}"#,
            )
            .create_async()
            .await;

        let project = ProjectRef {
            tenant: TenantRef::new("openstack"),
            name: "nova".into(),
        };
        let pipelines = client(&server).pipelines(&project).await.unwrap();

        assert_eq!(pipelines.len(), 2);
        assert_eq!(pipelines[0].name, "check");
        assert_eq!(pipelines[0].job_names, vec!["tox-py3", "pep8", "grenade"]);
        assert_eq!(pipelines[1].name, "gate");
    }

    #[tokio::test]
    async fn lists_job_variants() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tenant/openstack/job/tox-py3")
            .with_body(
                r#"[
                    {"description": "master", "parent": "tox", "branches": [], "variables": {"python": "3.11"}},
                    {"description": "stable", "parent": "tox", "branches": ["stable/zed"], "variables": {}}
                ]"#,
            )
            .create_async()
            .await;

        let job = JobRef::new(&TenantRef::new("openstack"), "tox-py3");
        let variants = client(&server).variants(&job).await.unwrap();

        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].parent(), Some("tox"));
        assert_eq!(variants[1].raw.branches, vec!["stable/zed"]);
    }

    #[tokio::test]
    async fn builds_pass_server_side_filters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tenant/openstack/builds")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("job_name".into(), "tox-py3".into()),
                Matcher::UrlEncoded("result".into(), "FAILURE".into()),
            ]))
            .with_body(r#"[{"uuid": "b1", "result": "FAILURE", "project": "nova", "pipeline": "check"}]"#)
            .create_async()
            .await;

        let job = JobRef::new(&TenantRef::new("openstack"), "tox-py3");
        let query = BuildQuery {
            results: vec!["FAILURE".into()],
        };
        let builds = client(&server).builds(&job, &query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].raw.uuid, "b1");
    }

    #[tokio::test]
    async fn missing_job_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tenant/openstack/job/ghost")
            .with_status(404)
            .create_async()
            .await;

        let job = JobRef::new(&TenantRef::new("openstack"), "ghost");
        let err = client(&server).variants(&job).await.unwrap_err();
        assert!(matches!(
            err,
            CITreeError::RemoteApi {
                kind: RemoteErrorKind::NotFound,
                ..
            }
        ));
    }

    #[test]
    fn builds_web_links() {
        let client =
            ZuulRestClient::from_settings(SessionSettings::new("https://zuul.example/")).unwrap();
        let tenant = TenantRef::new("openstack");

        let project = ProjectRef {
            tenant: tenant.clone(),
            name: "nova".into(),
        };
        assert_eq!(
            client.project_url(&project).as_deref(),
            Some("https://zuul.example/t/openstack/project/nova")
        );
        assert_eq!(
            client.job_url(&JobRef::new(&tenant, "tox-py3")).as_deref(),
            Some("https://zuul.example/t/openstack/job/tox-py3")
        );
    }
}
