pub mod prepare_env;
pub mod stubs;
