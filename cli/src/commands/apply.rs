use std::{
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use waybill::{manifest::Manifest, BatchUpdater, GuideUpdateRequest, UpdateRequest};

use crate::{
    commands::connect,
    console::{print_error_message, print_json, print_success_message, print_warn_message},
};

pub fn parse_requests(contents: &str) -> Result<Vec<UpdateRequest>, serde_json::Error> {
    let requests: Vec<GuideUpdateRequest> = serde_json::from_str(contents)?;
    Ok(requests.into_iter().map(UpdateRequest::from).collect())
}

fn read_requests_file(file: &Path) -> Result<String, std::io::Error> {
    if file == Path::new("-") {
        let mut contents = String::new();
        std::io::stdin().read_to_string(&mut contents)?;
        return Ok(contents);
    }

    std::fs::read_to_string(file)
}

pub async fn handle_apply_command(
    manifest: &Manifest,
    file: &PathBuf,
    timeout_secs: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let contents = read_requests_file(file).map_err(|e| {
        print_error_message(&format!("Could not read {}: {}", file.display(), e));
        e
    })?;

    let requests = parse_requests(&contents).map_err(|e| {
        print_error_message(&format!("Could not parse update requests: {}", e));
        e
    })?;

    let client = Arc::new(connect(manifest).await?);
    let updater = BatchUpdater::new(client, manifest.updates.table.as_str()).map_err(|e| {
        print_error_message(&format!("Invalid `updates.table` in the manifest: {}", e));
        e
    })?;

    let result = match timeout_secs {
        Some(secs) => {
            tokio::time::timeout(Duration::from_secs(secs), updater.apply_batch(&requests))
                .await
                .map_err(|_| {
                    let message = format!(
                        "Batch update timed out after {}s, the transaction was rolled back",
                        secs
                    );
                    print_error_message(&message);
                    message
                })?
        }
        None => updater.apply_batch(&requests).await,
    };

    print_json(&result)?;

    if result.success {
        print_success_message(&result.message);
        Ok(())
    } else if result.committed {
        print_warn_message(&result.message);
        Err(result.message.into())
    } else {
        print_error_message(&result.message);
        Err(result.message.into())
    }
}
