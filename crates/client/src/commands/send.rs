// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_core::{parse_header, Method, RequestSpec};

use crate::config::Config;
use crate::error::Result;
use crate::offline::IssueOutcome;

use super::open_requests;

pub async fn run(
    config: &Config,
    method: &str,
    url: &str,
    headers: &[String],
    body: Option<String>,
) -> Result<()> {
    let request = build_request(method, url, headers, body)?;
    let requests = open_requests(config)?;

    match requests.issue(request).await? {
        IssueOutcome::Completed(response) => {
            println!("completed {}", response.status);
            if !response.body.is_empty() {
                println!("{}", response.body);
            }
        }
        IssueOutcome::Queued(entry) => println!("queued {}", entry.id),
    }
    Ok(())
}

/// Builds a request from command-line pieces.
pub(crate) fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    body: Option<String>,
) -> Result<RequestSpec> {
    let method: Method = method.parse()?;
    let mut request = RequestSpec::new(method, url);
    for line in headers {
        let (name, value) = parse_header(line)?;
        request = request.header(name, value);
    }
    if let Some(body) = body {
        request = request.body(body);
    }
    Ok(request)
}

#[cfg(test)]
#[path = "send_tests.rs"]
mod tests;
