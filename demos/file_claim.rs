use crop_claim_builder::{
    ClaimEvent, ClaimInput, ClaimOutcome, ClaimPipeline, ClaimStore, GeminiClient, GeminiConfig,
    InMemoryStore, JsonFileStore, PipelineConfig, UploadedFile,
};
use dotenv::dotenv;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

const USAGE: &str =
    "usage: file_claim <voice.ogg> <satbara.pdf|jpg> <crop.jpg> <mobile> [store-dir]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    let Some(gemini) = GeminiConfig::from_env() else {
        eprintln!("⚠️  Set GOOGLE_API_KEY or GEMINI_API_KEY to run this demo.");
        return Ok(());
    };

    let store: Arc<dyn ClaimStore> = match args.get(4) {
        Some(dir) => {
            println!("💾 Saving claims under {}", dir);
            Arc::new(JsonFileStore::open(dir).await?)
        }
        None => Arc::new(InMemoryStore::new()),
    };

    let input = ClaimInput {
        audio: UploadedFile::from_path(Path::new(&args[0])).await?,
        land_document: UploadedFile::from_path(Path::new(&args[1])).await?,
        crop_photo: UploadedFile::from_path(Path::new(&args[2])).await?,
        mobile_number: args[3].clone(),
    };

    let config = PipelineConfig::default().with_model(gemini.model.clone());
    let backend = Arc::new(GeminiClient::from_config(&gemini));
    let pipeline = Arc::new(ClaimPipeline::new(backend, store, config));

    println!("🚀 Filing claim for {}...\n", input.mobile_number);

    let (tx, mut rx) = mpsc::channel(16);
    let handle = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.process_claim_with_progress(input, Some(tx)).await })
    };

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                ClaimEvent::Starting => println!("🔄 Starting claim workflow..."),
                ClaimEvent::NormalizingMedia => println!("📎 Checking uploads..."),
                ClaimEvent::Invoking => println!("🤖 AI is reading the 7/12, photo and voice note..."),
                ClaimEvent::Parsing => println!("⚙️  Parsing response..."),
                ClaimEvent::Validating => println!("🔍 Re-checking crop, owner and payout..."),
                ClaimEvent::Persisting => println!("💾 Saving claim..."),
                ClaimEvent::Success { application_id } => {
                    println!("✅ Claim filed: {}", application_id)
                }
                ClaimEvent::Failed { reason } => println!("❌ Claim failed: {}", reason),
            }
        }
    });

    let outcome = handle.await?;
    match &outcome {
        ClaimOutcome::Success {
            data,
            full_report_data,
            voice_response,
        } => {
            println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("   Application: {}", data.application_id);
            println!("   Farmer:      {}", data.form_fields.farmer_full_name);
            println!("   Crop:        {}", data.form_fields.crop_name);
            println!("   Area:        {} Ha", data.form_fields.sown_area_hectare);
            println!("   Premium:     {}", data.form_fields.premium_amount);
            println!("   Payout:      {}", data.estimated_payout);
            println!("   Verdict:     {}", full_report_data.verification.status);
            println!("   Logic:       {}", full_report_data.claim_estimation.logic);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("\n🗣️  {}", voice_response);

            if let Some(report) = outcome.narrative_report(None) {
                println!("\n📄 Report filer: {} ({})", report.printable_filer_name(), report.payout_line());
            }

            let history = pipeline.repository().history(&data.mobile).await?;
            println!("📚 Claims on file for this number: {}", history.len());
        }
        ClaimOutcome::Error { reason } => {
            println!("\n❌ {}", reason);
        }
    }

    println!("\n{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
