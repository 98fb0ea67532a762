// ABOUTME: Tool module - the invocable abstraction, results, and the Toolbox
// ABOUTME: that binds a filtered catalog to invocables by name.

mod result;
mod toolbox;
mod traits;

pub use result::*;
pub use toolbox::*;
pub use traits::*;
