mod command;
mod endpoint;
mod intent;
mod sensor;
mod status;

pub use command::*;
pub use endpoint::*;
pub use intent::*;
pub use sensor::*;
pub use status::*;
