use anyhow::Context;
use campaign_monitor::{
    endpoints::DEFAULT_BASE_URL,
    models::{ConsentToTrack, CustomField, SmartEmailRequest, SubscriberRequest},
    Client, Config, PageSize, Payload,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser, Clone)]
#[command(name = "campaign-monitor")]
#[command(about = "A CLI tool to manage a Campaign Monitor list and send smart emails")]
struct Cli {
    #[arg(short, long, env = "CAMPAIGN_MONITOR_AUTH_TOKEN", hide_env_values = true)]
    auth_token: String,
    #[arg(short, long, env = "CAMPAIGN_MONITOR_LIST_ID")]
    list_id: String,
    #[arg(short, long, env = "CAMPAIGN_MONITOR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand, Clone)]
enum Commands {
    #[command(about = "Adds a subscriber to the list")]
    Add(SubscriberArgs),
    #[command(about = "Updates the subscriber currently registered as --email")]
    Update {
        #[arg(long)]
        email: String,
        #[command(flatten)]
        subscriber: SubscriberArgs,
    },
    #[command(about = "Sends a smart (transactional) email")]
    Send {
        #[arg(short, long)]
        template_id: String,
        #[arg(long, required = true)]
        to: Vec<String>,
        /// Template variables as key=value
        #[arg(short, long, value_parser = parse_key_value)]
        data: Vec<(String, String)>,
        #[arg(long)]
        add_to_list: bool,
        #[arg(long, value_enum, default_value_t = Consent::Unchanged)]
        consent: Consent,
    },
    #[command(about = "Shows the details of one subscriber")]
    Get {
        #[arg(long)]
        email: String,
    },
    #[command(about = "Lists all the active subscribers")]
    List {
        #[arg(long, default_value_t = 100)]
        page_size: usize,
    },
}

#[derive(Debug, Args, Clone)]
struct SubscriberArgs {
    /// Email address to store for the subscriber
    #[arg(long = "address", required_unless_present = "json")]
    email_address: Option<String>,
    #[arg(long)]
    name: Option<String>,
    /// Custom fields as key=value
    #[arg(short, long = "field", value_parser = parse_key_value)]
    fields: Vec<(String, String)>,
    #[arg(long)]
    resubscribe: bool,
    #[arg(long, value_enum, default_value_t = Consent::Unchanged)]
    consent: Consent,
    /// Raw JSON body sent as is, ignoring the other subscriber flags
    #[arg(long)]
    json: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Consent {
    Yes,
    No,
    Unchanged,
}

impl From<Consent> for ConsentToTrack {
    fn from(value: Consent) -> Self {
        match value {
            Consent::Yes => ConsentToTrack::Yes,
            Consent::No => ConsentToTrack::No,
            Consent::Unchanged => ConsentToTrack::Unchanged,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

impl SubscriberArgs {
    fn into_payload(self) -> Result<Payload, anyhow::Error> {
        if let Some(json) = self.json {
            return Ok(Payload::from(json));
        }
        let req = SubscriberRequest {
            email_address: self.email_address.unwrap_or_default(),
            name: self.name,
            custom_fields: self
                .fields
                .into_iter()
                .map(|(key, value)| CustomField { key, value })
                .collect(),
            resubscribe: self.resubscribe,
            consent_to_track: self.consent.into(),
        };
        Payload::json(&req).context("serializing subscriber")
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = Config::new(args.list_id, args.auth_token)?.with_base_url(args.base_url)?;
    let client = Client::new(config)?;

    match args.command {
        Commands::Add(subscriber) => {
            let resp = client.add_subscriber(subscriber.into_payload()?).await?;
            println!("{resp}");
        }
        Commands::Update { email, subscriber } => {
            let resp = client
                .update_subscriber(subscriber.into_payload()?, &email)
                .await?;
            println!("{resp}");
        }
        Commands::Send {
            template_id,
            to,
            data,
            add_to_list,
            consent,
        } => {
            let req = SmartEmailRequest {
                to,
                data: data.into_iter().collect::<BTreeMap<_, _>>(),
                add_recipients_to_list: add_to_list,
                consent_to_track: consent.into(),
                ..Default::default()
            };
            let resp = client
                .send_transactional_email(&template_id, Payload::json(&req)?)
                .await?;
            println!("{resp}");
        }
        Commands::Get { email } => {
            let subscriber = client.get_subscriber(&email).await?;
            println!("{}", serde_json::to_string_pretty(&subscriber)?);
        }
        Commands::List { page_size } => {
            let client = client.with_page_size(PageSize::new(page_size));
            println!("email_address,name,state,date");
            client
                .active_subscribers()
                .for_each(|res| async move {
                    match res {
                        Ok(s) => println!(
                            "{},\"{}\",{},{}",
                            s.email_address, s.name, s.state, s.date
                        ),
                        Err(err) => eprintln!("{err}"),
                    }
                })
                .await;
        }
    }

    Ok(())
}
