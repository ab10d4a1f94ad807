pub mod blocking;
pub mod manager;
pub mod name;
pub mod phonetic;
pub mod selector;
pub mod similarity;
