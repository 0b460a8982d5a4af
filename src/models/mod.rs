pub mod list;
pub mod session;
pub mod task;
pub mod user;

pub use list::{List, ListInput, ListPatch};
pub use session::{Session, Sessions};
pub use task::{Task, TaskInput, TaskPatch};
pub use user::{User, UserInput};
