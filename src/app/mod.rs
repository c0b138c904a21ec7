mod run;
mod summary;

pub(crate) use run::run;
