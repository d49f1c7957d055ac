mod author;
mod media;
mod post;

pub use author::{Author, NewAuthor};
pub use media::{Media, NewMedia};
pub use post::{NewPost, Post};
