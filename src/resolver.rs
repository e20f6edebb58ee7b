//! Resolution of job class names.

/// Maps the opaque job-class name stored on a job row to something the
/// hosting scheduler can instantiate. The store only consults it when
/// materializing a job, surfacing a class-load error for unknown names.
pub trait ClassResolver: Send + Sync {
    fn resolve(&self, class_name: &str) -> bool;
}

/// Resolver that accepts every class name. Suitable when the hosting
/// scheduler performs its own late binding.
#[derive(Debug, Default)]
pub struct AcceptAllResolver;

impl ClassResolver for AcceptAllResolver {
    fn resolve(&self, _class_name: &str) -> bool {
        true
    }
}
