use crate::core::rnd::Rnd;
use crate::domain::model::Sample;
use crate::utils::error::Result;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A kind of input the engine can produce repeatedly.
pub trait Workload: Send + Sync {
    fn name(&self) -> &str;

    fn produce(&self, rnd: &mut Rnd, index: usize) -> Result<Sample>;
}
