use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::media::MediaSelection;
use crate::news::{NewsClient, NewsPager};
use crate::state::AppState;
use chrono::{FixedOffset, NaiveDate, Offset};
use clap::{Parser, Subcommand};
use common::history::{confidence_band, format_day, format_time};
use common::report::{channels, ReportKind};
use common::types::{decode_face_results, DEFAULT_WATERMARK_TEXT};
use common::verdict::aggregate;
use common::{
    Aggregate, AnalysisRecord, DetectionOutcome, ProtectionJobType, ProtectionRequest,
    RegisterRequest,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "imreal",
    version,
    about = "Check images and videos for deepfakes and protect your photos"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "IMREAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        nickname: String,
        #[arg(long, env = "IMREAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        password_confirm: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami {
        /// Fetch the latest profile from the service first
        #[arg(long)]
        refresh: bool,
    },
    /// Analyze an image or video for deepfakes
    Detect { path: PathBuf },
    /// Add a watermark and/or adversarial noise to an image
    Protect {
        path: PathBuf,
        #[arg(long, default_value = "watermark")]
        job_type: ProtectionJobType,
        #[arg(long, default_value = DEFAULT_WATERMARK_TEXT)]
        text: String,
    },
    /// List past analyses
    History {
        /// Only show records from this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// UTC offset in hours used to decide the day; defaults to local time
        #[arg(long, allow_negative_numbers = true)]
        utc_offset: Option<i32>,
    },
    /// Show one past analysis in detail
    Record { id: u64 },
    /// Show analysis counts
    Stats,
    /// Latest deepfake news
    News {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Where to report suspicious content
    Report {
        #[arg(long, default_value = "simple")]
        kind: ReportKind,
    },
    /// Aggregate an encoded face-result list
    DecodeFaces { encoded: String },
    /// Show or upload the profile picture
    ProfileImage {
        #[arg(long)]
        upload: Option<PathBuf>,
    },
}

/// Execute one command against the shared state
pub async fn run(command: Command, state: &AppState, config: &Config) -> ClientResult<()> {
    match command {
        Command::Login { email, password } => {
            let session = state.login(&email, &password).await?;
            println!("Welcome, {}!", session.user.nickname);
        }
        Command::Register {
            email,
            nickname,
            password,
            password_confirm,
        } => {
            let request = RegisterRequest {
                email,
                nickname,
                password,
                password_confirm,
            };
            let session = state.register(&request).await?;
            println!("Account created. Welcome, {}!", session.user.nickname);
        }
        Command::Logout => {
            state.logout().await?;
            println!("Logged out.");
        }
        Command::Whoami { refresh } => {
            if refresh {
                state.refresh_profile().await;
            }
            let user = state.session.user().await.ok_or(ClientError::AuthRequired)?;
            println!("{} <{}> (id {})", user.nickname, user.email, user.user_id);
        }
        Command::Detect { path } => {
            let media = MediaSelection::from_path(&path).await?;
            let analysis = state.analyze(&media).await?;
            println!("Record #{}", analysis.response.record_id);
            if let Some(secs) = analysis.response.processing_time {
                println!("Processing time: {:.2}s", secs);
            }
            print_outcome(&analysis.outcome);
            for face in &analysis.response.face_quality_scores {
                if let Some(url) = &face.result_url {
                    println!(
                        "  face {}: {}",
                        face.face_id.map(|id| id.to_string()).unwrap_or_else(|| "?".into()),
                        url
                    );
                }
            }
        }
        Command::Protect {
            path,
            job_type,
            text,
        } => {
            let request = ProtectionRequest::new(job_type, &text)?;
            let media = MediaSelection::from_path(&path).await?;
            let job = state.protect(&media, &request).await?;
            println!("Job {} is {}", job.job_id, job.status);
            if job.protected_files.is_empty() {
                println!("No protected files were returned.");
            }
            for (version, file) in job.results_for(job_type) {
                match file.and_then(|f| f.result_url.as_deref()) {
                    Some(url) => println!("  {}: {}", version, url),
                    None => println!("  {}: no download available", version),
                }
            }
        }
        Command::History { date, utc_offset } => {
            let offset = resolve_offset(utc_offset)?;
            let records = state.history(date, &offset).await?;
            if records.is_empty() {
                match date {
                    Some(day) => println!("No analyses on {}.", format_day(day)),
                    None => println!("No analyses yet."),
                }
            }
            for record in &records {
                print_history_line(record, &offset);
            }
        }
        Command::Record { id } => {
            let record = state.record(id).await?;
            print_record(&record);
        }
        Command::Stats => {
            let stats = state.statistics().await?;
            println!("Total analyses: {}", stats.total_analyses);
            println!("  safe:       {}", stats.safe_count);
            println!("  suspicious: {}", stats.suspicious_count);
            println!("  deepfake:   {}", stats.deepfake_count);
        }
        Command::News { page } => {
            let api_key = config
                .news_api_key
                .as_deref()
                .ok_or_else(|| ClientError::InvalidInput("NEWS_API_KEY is not set".to_string()))?;
            let news = NewsClient::new(
                &config.news_api_url,
                api_key,
                Duration::from_secs(config.timeout_secs),
            )?;
            let mut pager = NewsPager::default();
            let result = news.fetch(page, pager.page_size()).await?;
            pager.update(page, result.total_results);

            for article in &result.articles {
                println!("- {}", article.title);
                println!("  {}", article.url);
            }
            println!("Page {} of {}", pager.current_page(), pager.total_pages());
        }
        Command::Report { kind } => {
            for channel in channels(kind) {
                println!("{}: {}", channel.title, channel.url);
                if let Some(uri) = channel.emergency_uri() {
                    println!("  emergency: {}", uri);
                }
                if let Some(uri) = channel.consultation_uri() {
                    println!("  consultation: {}", uri);
                }
            }
        }
        Command::DecodeFaces { encoded } => {
            let faces = decode_face_results(&encoded)?;
            match aggregate(&faces, state.policy) {
                Some(agg) => print_aggregate(&agg),
                None => println!("No face detected."),
            }
        }
        Command::ProfileImage { upload } => {
            let token = state.session.require_token().await?;
            let image = match upload {
                Some(path) => {
                    let media = MediaSelection::from_path(&path).await?;
                    state.api.upload_profile_image(&token, &media).await?
                }
                None => state.api.profile_image(&token).await,
            };
            match image.profile_image_url.or(image.profile_image) {
                Some(url) => println!("{}", url),
                None => println!("No profile picture set."),
            }
        }
    }

    Ok(())
}

/// Text shown on stderr when a command fails
pub fn failure_message(err: &ClientError) -> String {
    if err.is_retryable() {
        format!("{} This is usually temporary.", err.user_message())
    } else {
        err.user_message()
    }
}

fn resolve_offset(hours: Option<i32>) -> ClientResult<FixedOffset> {
    match hours {
        Some(h) => h
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ClientError::InvalidInput(format!("invalid UTC offset: {}", h))),
        None => Ok(chrono::Local::now().offset().fix()),
    }
}

fn print_outcome(outcome: &DetectionOutcome) {
    match outcome {
        DetectionOutcome::NoFaceDetected => {
            println!("No face detected. Try a clearer photo of a face.")
        }
        DetectionOutcome::Analyzed(agg) => print_aggregate(agg),
    }
}

fn print_aggregate(agg: &Aggregate) {
    if agg.is_safe() {
        println!("Looks safe.");
    } else {
        println!("Needs attention: possible deepfake.");
    }
    match agg.split {
        Some(split) => println!("Fake {}% / Real {}%", split.fake, split.real),
        None => println!("No usable scores were returned."),
    }
    println!("Faces: {} ({} scored)", agg.face_count, agg.rated_faces);
    if agg.rules_disagree() {
        println!("Note: per-face flags and the average score disagree for this item.");
    }
}

fn print_history_line(record: &AnalysisRecord, offset: &FixedOffset) {
    let local = record.created_at.with_timezone(offset);
    println!(
        "#{:<6} {} {}  {}",
        record.record_id,
        format_day(local.date_naive()),
        format_time(&local),
        record.analysis_result.label()
    );
}

fn print_record(record: &AnalysisRecord) {
    println!("Record #{}", record.record_id);
    println!("Result: {}", record.analysis_result.label());
    if let Some(score) = record.confidence_score {
        println!("Confidence: {:.1}% ({})", score, confidence_band(score).label());
    }
    if let Some(kind) = &record.analysis_type {
        println!("Type: {}", kind);
    }
    if let Some(format) = &record.file_format {
        println!("Format: {}", format);
    }
    println!("Analyzed at: {}", record.created_at.to_rfc3339());
    if let Some(url) = &record.heatmap_url {
        println!("Heatmap: {}", url);
    }
    for (index, face) in record.detection_details.iter().enumerate() {
        let id = face.face_id.or(face.person_id).unwrap_or(index as u64 + 1);
        let verdict = if face.is_deepfake { "deepfake" } else { "real" };
        println!(
            "  person {}: {} ({:.1}%)",
            id,
            verdict,
            common::history::face_confidence_percent(face)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_detect() {
        let cli = Cli::try_parse_from(["imreal", "detect", "photo.jpg"]).unwrap();
        assert!(matches!(cli.command, Command::Detect { ref path } if path == &PathBuf::from("photo.jpg")));
    }

    #[test]
    fn test_parse_protect_defaults() {
        let cli = Cli::try_parse_from(["imreal", "protect", "me.png"]).unwrap();
        match cli.command {
            Command::Protect { job_type, text, .. } => {
                assert_eq!(job_type, ProtectionJobType::Watermark);
                assert_eq!(text, DEFAULT_WATERMARK_TEXT);
            }
            other => panic!("Expected Protect, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_protect_rejects_unknown_job_type() {
        assert!(Cli::try_parse_from(["imreal", "protect", "me.png", "--job-type", "blur"]).is_err());
    }

    #[test]
    fn test_parse_history_date_and_negative_offset() {
        let cli = Cli::try_parse_from([
            "imreal",
            "history",
            "--date",
            "2025-09-13",
            "--utc-offset",
            "-5",
        ])
        .unwrap();
        match cli.command {
            Command::History { date, utc_offset } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 9, 13));
                assert_eq!(utc_offset, Some(-5));
            }
            other => panic!("Expected History, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_report_kind() {
        let cli = Cli::try_parse_from(["imreal", "report", "--kind", "ecrm"]).unwrap();
        assert!(matches!(cli.command, Command::Report { kind: ReportKind::Ecrm }));
    }

    #[test]
    fn test_resolve_offset() {
        assert_eq!(
            resolve_offset(Some(9)).unwrap(),
            FixedOffset::east_opt(9 * 3600).unwrap()
        );
        assert!(resolve_offset(Some(30)).is_err());
    }

    #[test]
    fn test_resolve_offset_out_of_range_is_error() {
        let cli = Cli::try_parse_from(["imreal", "history", "--utc-offset", "1000000"]).unwrap();
        let Command::History { utc_offset, .. } = cli.command else {
            panic!("Expected History");
        };

        let err = resolve_offset(utc_offset).unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
        assert!(resolve_offset(Some(i32::MIN)).is_err());
    }

    #[test]
    #[serial]
    fn test_password_from_env_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "IMREAL_PASSWORD=from-dotenv\n").unwrap();
        std::env::remove_var("IMREAL_PASSWORD");

        dotenvy::from_path(&path).unwrap();
        let parsed = Cli::try_parse_from(["imreal", "login", "--email", "kim@example.com"]);
        std::env::remove_var("IMREAL_PASSWORD");

        match parsed.unwrap().command {
            Command::Login { password, .. } => assert_eq!(password, "from-dotenv"),
            other => panic!("Expected Login, got {:?}", other),
        }
    }

    #[test]
    fn test_failure_message_hints_retry() {
        let timeout = failure_message(&ClientError::Timeout);
        assert!(timeout.starts_with(&ClientError::Timeout.user_message()));
        assert!(timeout.ends_with("This is usually temporary."));

        let unavailable = ClientError::Server {
            status: 503,
            message: "busy".to_string(),
        };
        assert!(failure_message(&unavailable).contains("usually temporary"));

        let auth = ClientError::AuthRequired;
        assert_eq!(failure_message(&auth), auth.user_message());
    }
}
