// HTTP entry point
use actix_web::{web, App, HttpServer};
use flex_resolver::handlers::node_handler;
use flex_resolver::resolver::{ArmInventoryClient, FlexResolver, ResolverConfig};
use std::io;
use std::sync::Arc;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

fn to_io_error(err: flex_resolver::resolver::ResolveError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FLEX_RESOLVER_CONFIG").ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "usage: flex_resolver <config.json> (or set FLEX_RESOLVER_CONFIG)",
            )
        })?;
    let config = ResolverConfig::from_file(&config_path).map_err(to_io_error)?;
    let client = ArmInventoryClient::from_config(&config).map_err(to_io_error)?;

    log::info!(
        "resolving nodes in {}/{} (vmss flex ttl {:?}, vm ttl {:?}, cache disabled: {})",
        config.subscription_id,
        config.resource_group,
        config.vmss_flex_cache_ttl(),
        config.vm_cache_ttl(),
        config.disable_api_call_cache
    );
    let resolver = web::Data::new(FlexResolver::new(config, Arc::new(client)));

    let addr = std::env::var("FLEX_RESOLVER_ADDR").unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
    log::info!("listening on {}", addr);
    HttpServer::new(move || {
        App::new()
            .app_data(resolver.clone())
            .configure(node_handler::configure)
    })
    .bind(addr)?
    .run()
    .await
}
