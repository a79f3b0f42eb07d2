pub(crate) mod authors;
pub(crate) mod grouping;
pub(crate) mod history;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod shared;
