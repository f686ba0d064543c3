mod descriptor;
mod resolver;

pub use descriptor::*;
pub use resolver::*;
