mod add;
mod build;
mod export;
mod r#match;
mod search;
pub mod server;
mod train;
mod validate;

pub use add::*;
pub use build::*;
pub use export::*;
pub use r#match::*;
pub use search::*;
pub use server::*;
pub use train::*;
pub use validate::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
