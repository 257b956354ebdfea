//! Fetch command - request a URL through the worker

use super::shop::Shop;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{ShopError, ShopResult};
use crate::ui::UiContext;
use crate::worker::{EventResult, FetchOutcome, Method, Request, Response, WorkerEvent};
use console::style;
use std::io::Write;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> ShopResult<()> {
    let ctx = UiContext::detect();
    let shop = Shop::open(config).await?;
    let host = shop.host(&ctx).await?;

    let request = build_request(&shop, &args)?;
    let url = request.url.clone();

    let outcome = match host.dispatch(WorkerEvent::Fetch(request)).await? {
        EventResult::Fetched(outcome) => outcome,
        _ => return Err(ShopError::Internal(format!("fetch of {} produced no response", url))),
    };
    report_source(&outcome);

    if args.include {
        print!("{}", head(&outcome.response));
    }

    match args.output {
        Some(path) => {
            fs::write(&path, &outcome.response.body)
                .await
                .map_err(|e| ShopError::io(format!("writing {}", path.display()), e))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&outcome.response.body)
                .and_then(|_| stdout.flush())
                .map_err(|e| ShopError::io("writing response body", e))?;
        }
    }

    Ok(())
}

fn build_request(shop: &Shop, args: &FetchArgs) -> ShopResult<Request> {
    let method = Method::parse(&args.method)
        .ok_or_else(|| ShopError::User(format!("Unsupported HTTP method: {}", args.method)))?;

    let url = shop
        .worker
        .origin
        .join(&args.url)
        .map_err(|e| ShopError::User(format!("Invalid URL {}: {}", args.url, e)))?;

    let mut request = Request::new(method, &url);
    for (name, value) in &args.headers {
        request = request.with_header(name, value.as_str());
    }
    Ok(request)
}

fn report_source(outcome: &FetchOutcome) {
    eprintln!(
        "{} {} {} ({})",
        style("<").dim(),
        outcome.response.status,
        outcome.response.status_text,
        style(outcome.source).cyan()
    );
}

/// Status line and headers in HTTP/1.1 form
fn head(response: &Response) -> String {
    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status, response.status_text);
    for (name, value) in &response.headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str("\r\n");
    out
}
