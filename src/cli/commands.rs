use crate::config::{DispatchConfig, CONFIG_ENV_VAR};
use crate::dispatcher::{HandlerRequest, HandlerResponse, DEFAULT_LOCALE};
use crate::handler::{handler_fn, HandlerOutcome, MapHandlerRegistry};
use crate::mapping::HandlerMapping;
use crate::middleware::{
    is_cors_request, is_preflight_request, ExecutionChain, Interceptor, ACCESS_CONTROL_ALLOW_ORIGIN,
    CORS_REJECTION_STATUS, VARY,
};
use crate::router::describe_route;
use crate::view::ViewResolver;
use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Command-line interface for inspecting a dispatch configuration
///
/// Loads the same YAML file a service would and shows how requests are
/// mapped, intercepted and negotiated, without running any application code.
#[derive(Parser, Debug)]
#[command(name = "brrtdispatch")]
#[command(about = "BRRTDispatch CLI", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the route table, interceptors and CORS mappings
    Routes {
        /// Path to the dispatch configuration file (YAML)
        #[arg(short, long, env = CONFIG_ENV_VAR)]
        config: PathBuf,
    },
    /// Resolve a synthetic request and print how it would be dispatched
    Resolve {
        /// Path to the dispatch configuration file (YAML)
        #[arg(short, long, env = CONFIG_ENV_VAR)]
        config: PathBuf,

        /// HTTP method of the synthetic request
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request target, optionally with a query string
        #[arg(short, long)]
        path: String,

        /// Request header as 'Name: value' (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

/// Stand-in for a configured interceptor: carries the name and lets every request through.
struct PlaceholderInterceptor {
    name: String,
}

impl Interceptor for PlaceholderInterceptor {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Parse the process arguments and execute the command, writing to stdout.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file cannot be read or parsed
/// - A route pattern, media type or CORS mapping is invalid
/// - A header argument is not in `Name: value` form
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    execute(&cli, &mut stdout.lock())
}

/// Execute an already-parsed command against `out`.
pub fn execute(cli: &Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Routes { config } => {
            let config = DispatchConfig::load(config)?;
            print_routes(&config, out)
        }
        Commands::Resolve {
            config,
            method,
            path,
            headers,
        } => {
            let config = DispatchConfig::load(config)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method '{method}'"))?;
            let mut request = HandlerRequest::new(method, path);
            for header in headers {
                let (name, value) = parse_header(header)?;
                request = request.with_header(name, value);
            }
            print_resolution(&config, &request, out)
        }
    }
}

fn parse_header(raw: &str) -> anyhow::Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("Header must be 'Name: value', got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Header name is empty in '{raw}'"));
    }
    Ok((name, value.trim()))
}

fn print_routes(config: &DispatchConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let router = config.build_router()?;
    writeln!(out, "Routes ({}):", router.routes().len())?;
    for route in router.routes() {
        writeln!(out, "  {}", describe_route(route))?;
    }
    if let Some(default_handler) = &config.default_handler {
        writeln!(out, "Default handler: {default_handler}")?;
    }

    writeln!(out, "Interceptors ({}):", config.interceptors.len())?;
    for (idx, entry) in config.interceptors.iter().enumerate() {
        if entry.is_global() {
            writeln!(out, "  {idx}. {} (global)", entry.name)?;
        } else {
            writeln!(
                out,
                "  {idx}. {} include={:?} exclude={:?}",
                entry.name, entry.include, entry.exclude
            )?;
        }
    }

    // Validates every mapping before printing any of them.
    config.build_cors_source()?;
    writeln!(out, "CORS mappings ({}):", config.cors.len())?;
    for mapping in &config.cors {
        writeln!(
            out,
            "  {} origins={:?} methods={:?} credentials={:?}",
            mapping.pattern,
            mapping
                .allowed_origins
                .iter()
                .flatten()
                .chain(mapping.allowed_origin_patterns.iter().flatten())
                .collect::<Vec<_>>(),
            mapping.allowed_methods.as_deref().unwrap_or_default(),
            mapping.allow_credentials,
        )?;
    }
    Ok(())
}

/// Mapping whose handlers and interceptors are placeholders named after the configured ones.
fn placeholder_mapping(config: &DispatchConfig) -> anyhow::Result<HandlerMapping> {
    let mut registry = MapHandlerRegistry::new();
    let names = config
        .routes
        .iter()
        .map(|r| r.handler.as_str())
        .chain(config.default_handler.as_deref());
    for name in names {
        registry.register(name, handler_fn(name, |_req, _res| Ok(HandlerOutcome::Handled)));
    }

    let interceptors: HashMap<String, Arc<dyn Interceptor>> = config
        .interceptors
        .iter()
        .map(|entry| {
            let placeholder: Arc<dyn Interceptor> = Arc::new(PlaceholderInterceptor {
                name: entry.name.clone(),
            });
            (entry.name.clone(), placeholder)
        })
        .collect();

    config.build_mapping(Arc::new(registry), &interceptors)
}

fn print_resolution(config: &DispatchConfig, request: &HandlerRequest, out: &mut impl Write) -> anyhow::Result<()> {
    let mapping = placeholder_mapping(config)?;
    writeln!(out, "Request: {} {}", request.method, request.path)?;

    let Some(mut chain) = mapping.resolve(request)? else {
        writeln!(out, "Handler: <none> (404)")?;
        return Ok(());
    };
    debug!(request_id = %request.request_id, chain = ?chain, "Resolved chain");

    writeln!(out, "Handler: {}", chain.handler().name())?;
    if let Some(pattern) = request.attributes().best_matching_pattern() {
        writeln!(out, "Pattern: {pattern}")?;
    }
    let interceptor_names: Vec<&str> = chain.interceptors().iter().map(|h| h.name()).collect();
    writeln!(out, "Interceptors: {}", format_list(&interceptor_names))?;

    let variables: Vec<String> = request
        .attributes()
        .uri_template_variables()
        .map(|vars| vars.iter().map(|(k, v)| format!("{k}={v}")).collect())
        .unwrap_or_default();
    writeln!(out, "URI variables: {}", format_list(&variables))?;

    writeln!(out, "CORS: {}", cors_decision(&mut chain, request)?)?;

    let resolver = config.negotiation.build_view_resolver(Vec::new(), Vec::new())?;
    match resolver.media_types(request) {
        Some(media_types) => {
            let media_types: Vec<String> = media_types.iter().map(ToString::to_string).collect();
            writeln!(out, "Media types: {}", format_list(&media_types))?;
        }
        None => writeln!(out, "Media types: negotiation failed")?,
    }
    // No view resolvers are configured here, so this shows the fallback.
    match resolver.resolve_view_name(chain.handler().name(), DEFAULT_LOCALE, request)? {
        Some(view) => writeln!(out, "Unresolved view: {} (406)", view.name())?,
        None => writeln!(out, "Unresolved view: <none>")?,
    }
    Ok(())
}

/// Run the CORS part of the chain and summarise what the client would see.
fn cors_decision(chain: &mut ExecutionChain, request: &HandlerRequest) -> anyhow::Result<String> {
    if !is_cors_request(request) {
        return Ok("not a CORS request".to_string());
    }

    let mut response = HandlerResponse::default();
    let mut proceed = chain.apply_pre_handle(request, &mut response)?;
    if proceed && is_preflight_request(request) {
        chain.invoke_handler(request, &mut response)?;
        proceed = response.status != CORS_REJECTION_STATUS;
    }
    chain.trigger_after_completion(request, &mut response, None);

    if !proceed {
        return Ok(format!("rejected ({})", response.status));
    }
    if !response.has_header(ACCESS_CONTROL_ALLOW_ORIGIN) {
        return Ok("allowed (no CORS headers added)".to_string());
    }
    let headers: Vec<String> = response
        .headers
        .iter()
        .filter(|(name, _)| name.starts_with("access-control-") || name.eq_ignore_ascii_case(VARY))
        .map(|(name, value)| format!("{name}: {value}"))
        .collect();
    Ok(format!("allowed [{}]", headers.join("; ")))
}

fn format_list<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "<none>".to_string();
    }
    items.iter().map(|item| item.as_ref()).collect::<Vec<&str>>().join(", ")
}
