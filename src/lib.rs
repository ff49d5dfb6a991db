pub mod ast;
pub mod client;
pub mod compiler;
pub mod config;
pub mod error;
pub mod nobel;
pub mod parser;
pub mod results;
pub mod view;

#[cfg(test)]
mod testing;

pub use client::SparqlService;
pub use compiler::{build_query, render_pattern, render_prefixes, render_select, render_values};
pub use config::Config;
pub use error::{ClientError, ShapeError};
pub use parser::{parse_command, parse_filters, Command};
pub use results::{extract_bindings, BindingTable, SparqlResults};
pub use view::{ResultView, ViewState};
