use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use llmrelay::config::{ProcessorConfig, RequestLimits};
use llmrelay::error::Error;
use llmrelay::processor::{ProcessingState, RequestProcessor};
use llmrelay::synthesis::{
  summarize_artifacts, ResponseSynthesizer, TemplateSynthesizer,
};
use llmrelay::validation::{validate, ValidatedRequest};
use llmrelay::{LlmRequest, Model, Platform, RequestTracker, ResultStatus};
use tokio_test::{assert_err, assert_ok};

/// Counts calls and delegates to the template
struct CountingSynthesizer
{   calls: AtomicUsize
}

impl ResponseSynthesizer for CountingSynthesizer
{   fn synthesize(&self, request: &ValidatedRequest) -> String
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        TemplateSynthesizer.synthesize(request)
    }
}

/// Fails inside the pipeline, after validation
struct FaultySynthesizer;

impl ResponseSynthesizer for FaultySynthesizer
{   fn synthesize(&self, _request: &ValidatedRequest) -> String
    {   panic!("synthesis defect")
    }
}

fn processor() -> RequestProcessor
{   llmrelay::logging::init_with_level(log::LevelFilter::Warn);
    RequestProcessor::default()
}

fn strings(items: &[&str]) -> Vec<String>
{   items.iter().map(|s| s.to_string()).collect()
}

// ===== Enumerations =====

#[test]
fn test_platform_parsing()
{   assert_eq!("local".parse::<Platform>(), Ok(Platform::Local));
    assert_eq!(" HuggingFace ".parse::<Platform>(), Ok(Platform::HuggingFace));
    assert_eq!("OPENAI".parse::<Platform>(), Ok(Platform::OpenAI));
    assert!("bogus".parse::<Platform>().is_err());
    assert!("".parse::<Platform>().is_err());
    assert_eq!(
      Platform::names(),
      strings(&["huggingface", "openai", "local", "ollama"])
    );
}

#[test]
fn test_model_parsing()
{   assert_eq!("deepseek".parse::<Model>(), Ok(Model::DeepSeek));
    assert_eq!("Phi".parse::<Model>(), Ok(Model::Phi));
    assert!("llama3-70b".parse::<Model>().is_err());
    assert_eq!(
      Model::names(),
      strings(&["llama", "deepseek", "gpt", "mistral", "phi"])
    );
    let json = serde_json::to_string(&Model::DeepSeek).unwrap();
    assert_eq!(json, "\"deepseek\"");
}

// ===== Validation =====

#[test]
fn test_validate_accepts_empty_artifacts()
{   let request = LlmRequest::new(vec![], "local", "llama", "Summarize X");
    let validated = assert_ok!(validate(&request, &RequestLimits::default()));
    assert_eq!(validated.platform(), Platform::Local);
    assert_eq!(validated.model(), Model::Llama);
    assert!(validated.artifacts().is_empty());
    assert_eq!(validated.prompt(), "Summarize X");
}

#[test]
fn test_validate_reports_every_bad_field()
{   let request = LlmRequest::new(vec![], "bogus", "gpt-9", "   \n\t");
    let err = assert_err!(validate(&request, &RequestLimits::default()));
    assert_eq!(err.fields(), vec!["platform", "model", "prompt"]);
    assert!(err.has_field("platform"));
    assert!(err.has_field("prompt"));
    assert!(!err.has_field("artifacts"));
    let message = err.to_string();
    assert!(message.contains("platform 'bogus' is not supported"));
    assert!(message.contains("model 'gpt-9' is not supported"));
    assert!(message.contains("prompt must not be empty"));
}

#[test]
fn test_validate_enforces_limits()
{   let limits = RequestLimits
    {   max_artifacts: 2
      , max_artifact_chars: 5
      , max_prompt_chars: 10
    };

    let too_many = LlmRequest::new(strings(&["a", "b", "c"]), "local", "phi", "ok");
    let err = assert_err!(validate(&too_many, &limits));
    assert_eq!(err.fields(), vec!["artifacts"]);
    assert!(err.has_field("artifacts"));
    assert!(!err.has_field("prompt"));

    let too_long = LlmRequest::new(strings(&["abcdef"]), "local", "phi", "ok");
    let err = assert_err!(validate(&too_long, &limits));
    assert!(err.to_string().contains("artifact 1 has 6 characters"));

    let long_prompt = LlmRequest::new(vec![], "local", "phi", "0123456789x");
    let err = assert_err!(validate(&long_prompt, &limits));
    assert_eq!(err.fields(), vec!["prompt"]);

    // Limits count characters, not bytes
    let multibyte = LlmRequest::new(strings(&["ééééé"]), "local", "phi", "ok");
    assert_ok!(validate(&multibyte, &limits));
}

// ===== Synthesis =====

#[test]
fn test_artifact_summary()
{   assert_eq!(summarize_artifacts(&[]), "No artifacts provided");

    let long = "x".repeat(250);
    let summary = summarize_artifacts(&[
      "requirements".to_string(),
      long.clone(),
      "model".to_string(),
      "code".to_string(),
      "notes".to_string(),
    ]);
    assert!(summary.starts_with("Processing 5 artifact(s):"));
    assert!(summary.contains("- Artifact 1: requirements..."));
    assert!(summary.contains(&format!("- Artifact 2: {}...", "x".repeat(100))));
    assert!(!summary.contains(&"x".repeat(101)));
    assert!(!summary.contains("Artifact 4"));
    assert!(summary.ends_with("- ... and 2 more artifact(s)"));
}

#[test]
fn test_synthesis_is_deterministic()
{   let request = LlmRequest::new(
      strings(&["design doc"]), "ollama", "mistral", "List the risks"
    );
    let validated = validate(&request, &RequestLimits::default()).unwrap();
    let first = TemplateSynthesizer.synthesize(&validated);
    let second = TemplateSynthesizer.synthesize(&validated);
    assert_eq!(first, second);
    assert!(first.contains("List the risks"));
    assert!(first.contains("mistral"));
    assert!(first.contains("ollama"));
    assert!(first.contains("Processing 1 artifact(s)"));
}

// ===== Processor =====

#[test]
fn test_process_summarize_example()
{   let result = processor().process(
      &LlmRequest::new(vec![], "local", "llama", "Summarize X")
    );
    assert_eq!(result.status, ResultStatus::Success);
    assert!(result.request_id.starts_with("req_"));
    assert!(result.error.is_none());

    let text = result.response_text.as_deref().unwrap();
    let metadata = result.metadata.as_ref().unwrap();
    assert_eq!(metadata.platform_used, "local");
    assert_eq!(metadata.model_used, "llama");
    assert_eq!(metadata.artifacts_count, 0);
    assert_eq!(metadata.prompt_length, "Summarize X".chars().count());
    assert_eq!(metadata.response_length, text.chars().count());
    assert!(metadata.response_length > 0);
    assert!(result.processing_time_ms >= 0.0);
    assert!(result.processing_time_ms.is_finite());
    assert!(chrono::DateTime::parse_from_rfc3339(&result.timestamp).is_ok());
}

#[test]
fn test_process_bogus_platform()
{   let result = processor().process(
      &LlmRequest::new(strings(&["a"]), "bogus", "llama", "x")
    );
    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.invalid_fields, strings(&["platform"]));
    assert!(result.error.as_deref().unwrap().contains("platform"));
    assert!(result.response_text.is_none());
    assert!(result.metadata.is_none());
}

#[test]
fn test_process_whitespace_prompt()
{   let result = processor().process(
      &LlmRequest::new(vec![], "openai", "gpt", "  ")
    );
    assert_eq!(result.status, ResultStatus::Error);
    assert_eq!(result.invalid_fields, strings(&["prompt"]));
}

#[test]
fn test_rejected_request_never_reaches_synthesizer()
{   let counter = Arc::new(CountingSynthesizer { calls: AtomicUsize::new(0) });
    let processor = RequestProcessor::with_synthesizer(
      ProcessorConfig::default(),
      Arc::new(RequestTracker::new()),
      counter.clone()
    );

    for platform in ["bogus", "azure", "", "local-ish"]
    {   let result = processor.process(
          &LlmRequest::new(vec![], platform, "llama", "hello")
        );
        assert_eq!(result.status, ResultStatus::Error);
    }
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);

    let result = processor.process(
      &LlmRequest::new(vec![], "local", "llama", "hello")
    );
    assert!(result.is_success());
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_processor_counts_outcomes()
{   let tracker = Arc::new(RequestTracker::new());
    let processor = RequestProcessor::new(
      ProcessorConfig::default(),
      tracker.clone()
    );
    processor.process(&LlmRequest::new(vec![], "local", "phi", "one"));
    processor.process(&LlmRequest::new(vec![], "local", "phi", "two"));
    processor.process(&LlmRequest::new(vec![], "nope", "phi", "three"));

    let stats = tracker.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.rejected, 1);
    assert_eq!(processor.stats(), stats);

    tracker.reset();
    assert_eq!(tracker.stats().received, 0);
}

#[test]
fn test_processor_catalog_operations()
{   let processor = processor();
    let models = processor.supported_models();
    assert_eq!(models.count, 5);
    assert_eq!(models.supported_models, Model::names());

    let platforms = processor.supported_platforms();
    assert_eq!(platforms.count, 4);
    assert_eq!(platforms.supported_platforms, Platform::names());

    let health = processor.health();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, processor.config().version);

    let info = processor.info();
    assert_eq!(info.endpoints.get("process").map(String::as_str), Some("/process"));
    assert_eq!(info.endpoints.len(), 4);
}

#[test]
fn test_result_wire_shape()
{   let result = processor().process(
      &LlmRequest::new(strings(&["a", "b"]), "huggingface", "deepseek", "Explain")
    );
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["metadata"]["artifacts_count"], 2);
    assert_eq!(value["metadata"]["platform_used"], "huggingface");
    assert!(value.get("error").is_none());
    assert!(value.get("invalid_fields").is_none());

    let rejected = processor().process(
      &LlmRequest::new(vec![], "local", "bogus", "Explain")
    );
    let value = serde_json::to_value(&rejected).unwrap();
    assert_eq!(value["status"], "error");
    assert!(value["response_text"].is_null());
    assert!(value["metadata"].is_null());
    assert_eq!(value["invalid_fields"][0], "model");
}

#[test]
fn test_terminal_states()
{   assert!(ProcessingState::Completed.is_terminal());
    assert!(ProcessingState::Rejected.is_terminal());
    assert!(!ProcessingState::Received.is_terminal());
    assert!(!ProcessingState::Validated.is_terminal());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_request_ids_unique_under_concurrency()
{   let processor = Arc::new(processor());
    let mut handles = Vec::with_capacity(10_000);
    for _ in 0..10_000
    {   let processor = processor.clone();
        handles.push(tokio::spawn(async move {
          processor.process(
            &LlmRequest::new(vec![], "local", "llama", "same input")
          )
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles
    {   let result = handle.await.unwrap();
        assert!(result.is_success());
        assert!(result.processing_time_ms >= 0.0);
        ids.insert(result.request_id);
    }
    assert_eq!(ids.len(), 10_000);
    assert_eq!(processor.stats().completed, 10_000);
}

// ===== Service backend =====

#[tokio::test]
async fn test_service_backend_round_trip()
{   let backend = llmrelay::ServiceBackend::new(Arc::new(processor()));

    let result = backend
      .process_and_wait(LlmRequest::new(vec![], "local", "gpt", "hello"))
      .await;
    let result = assert_ok!(result);
    assert!(result.is_success());

    let rejected = backend
      .process_and_wait(LlmRequest::new(vec![], "bogus", "gpt", "hello"))
      .await;
    assert_eq!(assert_ok!(rejected).status, ResultStatus::Error);

    let health = assert_ok!(backend.health().await);
    assert_eq!(health.status, "healthy");
    assert_eq!(assert_ok!(backend.get_model_list().await).count, 5);
    assert_eq!(assert_ok!(backend.get_platform_list().await).count, 4);

    assert_ok!(backend.shutdown().await);
}

#[tokio::test]
async fn test_service_backend_reports_pipeline_fault_as_internal()
{   llmrelay::logging::init_with_level(log::LevelFilter::Warn);
    let processor = RequestProcessor::with_synthesizer(
      ProcessorConfig::default(),
      Arc::new(RequestTracker::new()),
      Arc::new(FaultySynthesizer)
    );
    let backend = llmrelay::ServiceBackend::new(Arc::new(processor));

    let err = assert_err!(
      backend
        .process_and_wait(LlmRequest::new(vec![], "local", "gpt", "hello"))
        .await
    );
    assert!(matches!(err, Error::Internal(_)));
    assert_eq!(err.kind(), "internal_error");
    assert_eq!(err.status_code(), 500);

    // The loop survives the fault
    assert_eq!(assert_ok!(backend.health().await).status, "healthy");
    let _ = backend.shutdown().await;
}

#[tokio::test]
async fn test_service_backend_queues_many()
{   let backend = llmrelay::ServiceBackend::new(Arc::new(processor()));
    let mut receivers = Vec::new();
    for i in 0..50
    {   let rx = backend.process(LlmRequest::new(
          vec![format!("artifact {}", i)], "ollama", "phi", "go"
        ));
        receivers.push(assert_ok!(rx));
    }

    let mut ids = HashSet::new();
    for mut rx in receivers
    {   let result = rx.recv().await.unwrap().unwrap();
        assert_eq!(result.metadata.unwrap().artifacts_count, 1);
        ids.insert(result.request_id);
    }
    assert_eq!(ids.len(), 50);
    let _ = backend.shutdown().await;
}
