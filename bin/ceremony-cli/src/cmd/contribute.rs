use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use argh::FromArgs;
use ceremony_core::paths;
use ceremony_crypto::{MockZkeyCryptoCore, ZkeyCryptoCore};
use ceremony_primitives::{format_zkey_index, CeremonyId, ContributionStep, ParticipantStatus};
use ceremony_rpc_api::{
    CeremonyApiClient, CompleteMultiPartUploadRequest, ContributionSnapshotResponse, GenerateGetObjectPreSignedUrlRequest,
    GeneratePreSignedUrlsPartsRequest, PermanentlyStoreContributionRequest, StartMultiPartUploadRequest, UploadedPartDto,
    VerifyContributionRequest,
};
use colored::Colorize;
use dialoguer::Password;
use indicatif::ProgressBar;
use jsonrpsee::http_client::HttpClient;

use crate::errors::{internal_error, DisplayableError, DisplayedError};
use crate::presigned;

/// Drives the caller's currently-assigned circuit through download, local
/// computation, upload and verification, looping until every circuit is
/// contributed to or the process is interrupted.
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "contribute")]
pub struct ContributeArgs {
    /// ceremony id
    #[argh(positional)]
    ceremony_id: String,

    /// github username recorded against this contribution
    #[argh(positional)]
    gh_username: String,

    /// seconds to wait between polls while queued
    #[argh(option, default = "10")]
    poll_interval_secs: u64,
}

pub async fn run(args: ContributeArgs, client: &HttpClient, token: &str, artifact_dir: &str) -> Result<(), DisplayedError> {
    let ceremony_id: CeremonyId = args.ceremony_id.clone().into();
    let crypto = MockZkeyCryptoCore::new();
    let mut computation_millis: i64 = 0;

    loop {
        let snapshot = client
            .get_contribution_snapshot(token.to_string(), ceremony_id.clone())
            .await
            .internal_error("getContributionSnapshot call failed")?;

        match snapshot.participant_status {
            ParticipantStatus::Waiting => {
                println!(
                    "{} {} ({} completed so far)",
                    "waiting in queue for circuit".yellow(),
                    snapshot.circuit_prefix,
                    snapshot.completed_contributions
                );
                tokio::time::sleep(Duration::from_secs(args.poll_interval_secs)).await;
            }
            ParticipantStatus::Ready | ParticipantStatus::Contributed => {
                client
                    .progress_to_next_contribution_step(token.to_string(), ceremony_id.clone())
                    .await
                    .internal_error("progressToNextContributionStep call failed")?;
            }
            ParticipantStatus::Contributing => match snapshot.contribution_step {
                None | Some(ContributionStep::Completed) => {
                    client
                        .progress_to_next_contribution_step(token.to_string(), ceremony_id.clone())
                        .await
                        .internal_error("progressToNextContributionStep call failed")?;
                }
                Some(ContributionStep::Downloading) => {
                    println!("{} {}", "downloading inputs for".cyan(), snapshot.circuit_prefix);
                    download_inputs(client, token, artifact_dir, &ceremony_id, &snapshot).await?;
                    client
                        .progress_to_next_contribution_step(token.to_string(), ceremony_id.clone())
                        .await
                        .internal_error("progressToNextContributionStep call failed")?;
                }
                Some(ContributionStep::Computing) => {
                    computation_millis = compute_contribution(artifact_dir, &snapshot, &crypto).await?;
                    client
                        .progress_to_next_contribution_step(token.to_string(), ceremony_id.clone())
                        .await
                        .internal_error("progressToNextContributionStep call failed")?;
                }
                Some(ContributionStep::Uploading) => {
                    upload_contribution(client, token, artifact_dir, &ceremony_id, &snapshot, computation_millis).await?;
                    client
                        .progress_to_next_contribution_step(token.to_string(), ceremony_id.clone())
                        .await
                        .internal_error("progressToNextContributionStep call failed")?;
                }
                Some(ContributionStep::Verifying) => {
                    let request = VerifyContributionRequest {
                        circuit_id: snapshot.circuit_id.clone(),
                        contribution_computation_time_millis: computation_millis,
                        gh_username: args.gh_username.clone(),
                    };
                    let outcome = client
                        .verify_contribution(token.to_string(), ceremony_id.clone(), request)
                        .await
                        .internal_error("verifyContribution call failed")?;
                    if outcome.valid {
                        println!("{}", "contribution verified".green());
                    } else {
                        println!("{}", "contribution rejected; slot burned, advancing".red());
                    }
                }
            },
            ParticipantStatus::Done | ParticipantStatus::Finalized => {
                println!("{}", "every circuit contributed to".green());
                return Ok(());
            }
            ParticipantStatus::TimedOut | ParticipantStatus::Exhumed => {
                return Err(internal_error("timed out while queued; run `resume` first")("".to_string()));
            }
            ParticipantStatus::Finalizing => {
                println!("{}", "awaiting ceremony finalization".yellow());
                return Ok(());
            }
            ParticipantStatus::Created => {
                return Err(internal_error("participant has not joined the queue; run `join` first")("".to_string()));
            }
        }
    }
}

fn local_work_dir(artifact_dir: &str, circuit_prefix: &str) -> PathBuf {
    Path::new(artifact_dir).join(".cli-work").join(circuit_prefix)
}

fn local_zkey_path(work_dir: &Path, snapshot: &ContributionSnapshotResponse) -> PathBuf {
    let zkey_index = format_zkey_index(snapshot.completed_contributions + 1, snapshot.zkey_index_width);
    work_dir.join(format!("{}_{}.zkey", snapshot.circuit_prefix, zkey_index))
}

fn previous_zkey_key(snapshot: &ContributionSnapshotResponse) -> String {
    if snapshot.completed_contributions == 0 {
        snapshot.initial_zkey_storage_path.clone()
    } else {
        let previous_index = format_zkey_index(snapshot.completed_contributions, snapshot.zkey_index_width);
        paths::contribution_zkey_path(&snapshot.ceremony_prefix, &snapshot.circuit_prefix, &previous_index)
    }
}

async fn fetch_object(
    client: &HttpClient,
    token: &str,
    artifact_dir: &str,
    ceremony_id: &CeremonyId,
    object_key: &str,
    dest: &Path,
) -> Result<(), DisplayedError> {
    let presigned = client
        .generate_get_object_pre_signed_url(
            token.to_string(),
            ceremony_id.clone(),
            GenerateGetObjectPreSignedUrlRequest { object_key: object_key.to_string() },
        )
        .await
        .internal_error("generateGetObjectPreSignedUrl call failed")?;
    let bytes = presigned::get_object(artifact_dir, &presigned.url).await.internal_error("download object failed")?;
    tokio::fs::write(dest, bytes).await.internal_error("write downloaded object to local work directory")?;
    Ok(())
}

async fn download_inputs(
    client: &HttpClient,
    token: &str,
    artifact_dir: &str,
    ceremony_id: &CeremonyId,
    snapshot: &ContributionSnapshotResponse,
) -> Result<(), DisplayedError> {
    let work_dir = local_work_dir(artifact_dir, &snapshot.circuit_prefix);
    tokio::fs::create_dir_all(&work_dir).await.internal_error("create local work directory")?;

    let pot_key = paths::pot_path(&snapshot.ceremony_prefix, &snapshot.pot_storage_path);
    fetch_object(client, token, artifact_dir, ceremony_id, &pot_key, &work_dir.join("pot.ptau")).await?;

    let previous_key = previous_zkey_key(snapshot);
    fetch_object(client, token, artifact_dir, ceremony_id, &previous_key, &work_dir.join("previous.zkey")).await?;

    Ok(())
}

async fn compute_contribution(
    artifact_dir: &str,
    snapshot: &ContributionSnapshotResponse,
    crypto: &MockZkeyCryptoCore,
) -> Result<i64, DisplayedError> {
    let work_dir = local_work_dir(artifact_dir, &snapshot.circuit_prefix);
    let previous_zkey = tokio::fs::read(work_dir.join("previous.zkey")).await.internal_error("read previous zkey")?;

    println!("{}", "Contribute some randomness of your own to the ceremony.".bold());
    let typed_entropy = Password::new()
        .with_prompt("Entropy (mash the keyboard)")
        .interact()
        .map_err(internal_error("failed to read entropy"))?;

    let mut seed = typed_entropy.into_bytes();
    seed.extend_from_slice(&std::process::id().to_le_bytes());
    let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    seed.extend_from_slice(&since_epoch.as_nanos().to_le_bytes());

    let pb = ProgressBar::new_spinner().with_message("computing contribution");
    pb.enable_steady_tick(Duration::from_millis(100));
    let start = Instant::now();
    let output = crypto.contribute(&previous_zkey, &seed);
    let elapsed_millis = start.elapsed().as_millis() as i64;
    pb.finish_with_message("contribution computed");

    tokio::fs::write(local_zkey_path(&work_dir, snapshot), &output.zkey).await.internal_error("write computed zkey")?;
    tokio::fs::write(work_dir.join("transcript.log"), &output.transcript).await.internal_error("write local transcript")?;

    Ok(elapsed_millis)
}

async fn upload_contribution(
    client: &HttpClient,
    token: &str,
    artifact_dir: &str,
    ceremony_id: &CeremonyId,
    snapshot: &ContributionSnapshotResponse,
    computation_millis: i64,
) -> Result<(), DisplayedError> {
    let work_dir = local_work_dir(artifact_dir, &snapshot.circuit_prefix);
    let data = tokio::fs::read(local_zkey_path(&work_dir, snapshot)).await.internal_error("read computed zkey for upload")?;

    let zkey_index = format_zkey_index(snapshot.completed_contributions + 1, snapshot.zkey_index_width);
    let object_key = paths::contribution_zkey_path(&snapshot.ceremony_prefix, &snapshot.circuit_prefix, &zkey_index);

    let upload_id = match &snapshot.upload_id {
        Some(id) => id.clone(),
        None => {
            client
                .start_multi_part_upload(
                    token.to_string(),
                    ceremony_id.clone(),
                    StartMultiPartUploadRequest { object_key: object_key.clone() },
                )
                .await
                .internal_error("startMultiPartUpload call failed")?
                .upload_id
        }
    };

    let chunk_size = snapshot.chunk_size_mb as usize * 1024 * 1024;
    let chunks: Vec<&[u8]> = data.chunks(chunk_size).collect();
    let urls = client
        .generate_pre_signed_urls_parts(
            token.to_string(),
            ceremony_id.clone(),
            GeneratePreSignedUrlsPartsRequest {
                object_key: object_key.clone(),
                upload_id: upload_id.clone(),
                number_of_parts: chunks.len() as u32,
            },
        )
        .await
        .internal_error("generatePreSignedUrlsParts call failed")?
        .urls;

    let already_uploaded: HashSet<u32> = snapshot.chunks.iter().map(|c| c.part_number).collect();
    let mut all_chunks: Vec<UploadedPartDto> = snapshot.chunks.clone();

    let pb = ProgressBar::new(chunks.len() as u64).with_message("uploading contribution");
    for (idx, chunk) in chunks.into_iter().enumerate() {
        let part_number = (idx + 1) as u32;
        if !already_uploaded.contains(&part_number) {
            let e_tag = presigned::put_part(artifact_dir, &urls[idx], chunk).await.internal_error("upload part failed")?;
            client
                .temporary_store_chunk_data(token.to_string(), ceremony_id.clone(), e_tag.clone(), part_number)
                .await
                .internal_error("temporaryStoreChunkData call failed")?;
            all_chunks.push(UploadedPartDto { e_tag, part_number });
        }
        pb.inc(1);
    }
    pb.finish_with_message("upload complete");

    all_chunks.sort_by_key(|c| c.part_number);
    client
        .complete_multi_part_upload(
            token.to_string(),
            ceremony_id.clone(),
            CompleteMultiPartUploadRequest { object_key: object_key.clone(), upload_id, parts: all_chunks },
        )
        .await
        .internal_error("completeMultiPartUpload call failed")?;

    let hash = presigned::blake2b512_hex(&data);
    client
        .permanently_store_current_contribution_time_and_hash(
            token.to_string(),
            ceremony_id.clone(),
            PermanentlyStoreContributionRequest { contribution_computation_time_millis: computation_millis, last_zkey_blake2b_hash: hash },
        )
        .await
        .internal_error("permanentlyStoreCurrentContributionTimeAndHash call failed")?;

    Ok(())
}
