mod cluster;
mod demo;

pub use cluster::KubeSource;
pub use demo::DemoSource;
