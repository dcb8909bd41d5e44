use quest_api::config::{load_dotenv, Environment};
use quest_lambda::InvocationHandler;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    load_dotenv();
    let environment = Environment::from_value(std::env::var("QUEST_ENV").ok().as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(environment.default_log_level())),
        )
        .with_target(false)
        .without_time()
        .init();

    quest_lambda::run(InvocationHandler::new(quest_api::load)).await
}
