use anyhow::{Result, anyhow};
use console::style;
use serde_json::Value;

use super::ClientArgs;
use crate::core::terminal::{GuideSection, print_error, print_success};

fn request(
    client: &reqwest::Client,
    method: reqwest::Method,
    args: &ClientArgs,
    path: &str,
) -> reqwest::RequestBuilder {
    let builder = client.request(method, format!("{}{}", args.api_url, path));
    match &args.token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

async fn send(builder: reqwest::RequestBuilder, api_url: &str) -> Result<Value> {
    let resp = builder.send().await.map_err(|e| {
        anyhow!(
            "Could not reach blogpilot at {} ({}). Is 'blogpilot serve' running?",
            api_url,
            e
        )
    })?;
    let body: Value = resp.json().await?;
    if body.get("success").and_then(Value::as_bool) == Some(true) {
        Ok(body)
    } else {
        let error = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        Err(anyhow!("Server refused the request: {}", error))
    }
}

fn print_stats(body: &Value) {
    let stats = &body["stats"];
    let count = |key: &str| stats[key].as_u64().unwrap_or(0).to_string();
    let running = if stats["is_running"].as_bool().unwrap_or(false) {
        style("RUNNING").green().bold().to_string()
    } else {
        style("STOPPED").dim().to_string()
    };
    let busy = if body["job_in_flight"].as_bool().unwrap_or(false) {
        "yes"
    } else {
        "no"
    };

    GuideSection::new("Autopilot")
        .status("Status", &running)
        .status(
            "Activity",
            stats["current_activity"]["label"].as_str().unwrap_or("?"),
        )
        .status("Job in flight", busy)
        .blank()
        .status("Total", &count("total_blogs"))
        .status("Succeeded", &count("successful_blogs"))
        .status("Failed", &count("failed_blogs"))
        .status("Last run", stats["last_run_time"].as_str().unwrap_or("Never"))
        .print();
}

pub async fn run_autopilot_command(sub_cmd: &str, args: &ClientArgs) -> Result<()> {
    let client = reqwest::Client::new();

    match sub_cmd {
        "start" => {
            let mut patch = serde_json::Map::new();
            if let Some(interval) = args.interval_minutes {
                patch.insert("interval_minutes".to_string(), interval.into());
            }
            let body = send(
                request(&client, reqwest::Method::POST, args, "/api/autopilot/start")
                    .json(&Value::Object(patch)),
                &args.api_url,
            )
            .await?;
            let interval = body["config"]["interval_minutes"].as_u64().unwrap_or(0);
            print_success(&format!(
                "Autopilot started, one post every {} minutes.",
                interval
            ));
        }
        "stop" => {
            send(
                request(&client, reqwest::Method::POST, args, "/api/autopilot/stop"),
                &args.api_url,
            )
            .await?;
            print_success("Autopilot stopped. A job already running will still finish.");
        }
        "status" => {
            let body = send(
                request(&client, reqwest::Method::GET, args, "/api/autopilot/stats"),
                &args.api_url,
            )
            .await?;
            print_stats(&body);
        }
        _ => {
            print_error("Unknown or missing autopilot command. Expected: start, stop, status");
        }
    }
    Ok(())
}
