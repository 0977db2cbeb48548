pub mod zuul;
