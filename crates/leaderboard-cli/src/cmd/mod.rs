pub mod catalog;
pub mod group;
pub mod lookup;
pub mod member;
pub mod post;
pub mod serve;
