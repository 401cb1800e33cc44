pub mod block;
pub mod comment;
pub mod coordinate;
pub mod module;
pub mod variable;

pub use block::Block;
pub use comment::Comment;
pub use coordinate::Coordinate;
pub use module::Module;
pub use variable::Variable;
