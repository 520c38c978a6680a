use anyhow::{bail, Context};
use config::{AppConfig, LoggingConfig};
use oauth_providers::{
    AccessToken, HttpTransport, OAuthFlow, QueryParams, ReqwestTransport, UserId,
    VkontakteProvider,
};
use std::sync::Arc;

const USAGE: &str = "usage: lookup <users [ID...] | friends [ID] | me | authorize>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Users(Vec<UserId>),
    Friends(Option<UserId>),
    Me,
    Authorize,
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    let Some((name, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let ids = rest
        .iter()
        .map(|arg| {
            arg.parse::<UserId>()
                .with_context(|| format!("invalid user id: {arg}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    match name.as_str() {
        "users" => Ok(Command::Users(ids)),
        "friends" if ids.len() <= 1 => Ok(Command::Friends(ids.first().copied())),
        "me" if ids.is_empty() => Ok(Command::Me),
        "authorize" if ids.is_empty() => Ok(Command::Authorize),
        _ => bail!(USAGE),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::resolve().context("Failed to load configuration")?;

    init_tracing(&config.logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;

    let token = std::env::var("VK_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .map(|t| match std::env::var("VK_USER_ID") {
            Ok(user_id) => AccessToken::new(t).with_value("user_id", user_id),
            Err(_) => AccessToken::new(t),
        });

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(30)?);
    let provider = VkontakteProvider::new(config.provider.clone(), transport.clone());

    let records = match command {
        Command::Users(ids) => {
            provider
                .users_get(&ids, token.as_ref(), &QueryParams::new())
                .await?
        }
        Command::Friends(user_id) => {
            provider
                .friends_get(user_id, token.as_ref(), &QueryParams::new())
                .await?
        }
        Command::Me => {
            let token = token.context("VK_ACCESS_TOKEN is required for `me`")?;
            let client = config
                .client
                .clone()
                .context("VK_CLIENT_ID, VK_CLIENT_SECRET and VK_REDIRECT_URI are required")?;
            let flow = OAuthFlow::new(provider, client, transport)?;
            vec![flow.resource_owner(&token).await?]
        }
        Command::Authorize => {
            let client = config
                .client
                .clone()
                .context("VK_CLIENT_ID, VK_CLIENT_SECRET and VK_REDIRECT_URI are required")?;
            let flow = OAuthFlow::new(provider, client, transport)?;
            let request = flow.authorization_request();
            tracing::info!(state = %request.state, "Authorization URL generated");
            println!("{}", request.url);
            return Ok(());
        }
    };

    tracing::info!(count = records.len(), "Lookup finished");
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}

fn init_tracing(logging_config: &LoggingConfig) {
    let filter = logging_config.filter_directive();

    // Initialize tracing based on the format specified in config
    match logging_config.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
