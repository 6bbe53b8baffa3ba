pub mod db_env;
pub mod logging;
pub mod nonce_config;
pub mod site;
