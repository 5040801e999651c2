pub(crate) mod categories;
pub(crate) mod dashboard;
pub(crate) mod form;
pub(crate) mod settings;
pub(crate) mod transactions;
