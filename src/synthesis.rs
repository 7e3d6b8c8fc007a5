//! Placeholder response generation standing in for real inference.
//!
//! Everything here is a pure function of the validated request: the same
//! input always yields the same text, and no input can make it fail.

use log::trace;

use crate::validation::ValidatedRequest;

/// How many artifacts get a preview line
pub const MAX_PREVIEWED_ARTIFACTS: usize = 3;

/// Characters shown per artifact preview
pub const PREVIEW_CHARS: usize = 100;

/// Summarize the artifacts the way the response cites them
pub fn summarize_artifacts(artifacts: &[String]) -> String
{   if artifacts.is_empty()
    {   return "No artifacts provided".to_string();
    }

    let mut summary = format!(
      "Processing {} artifact(s):",
      artifacts.len()
    );
    for (i, artifact) in artifacts
      .iter()
      .take(MAX_PREVIEWED_ARTIFACTS)
      .enumerate()
    {   summary.push_str(&format!(
          "\n- Artifact {}: {}",
          i + 1,
          preview(artifact)
        ));
    }
    if artifacts.len() > MAX_PREVIEWED_ARTIFACTS
    {   summary.push_str(&format!(
          "\n- ... and {} more artifact(s)",
          artifacts.len() - MAX_PREVIEWED_ARTIFACTS
        ));
    }
    summary
}

fn preview(artifact: &str) -> String
{   let head: String = artifact.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head.trim_end())
}

/// Compose the simulated model answer
pub fn synthesize(request: &ValidatedRequest) -> String
{   let platform = request.platform();
    let model = request.model();
    let context = summarize_artifacts(request.artifacts());
    let prompt = request.prompt();

    let text = format!(
"Response generated by model {model} on platform {platform}:

Artifact context:
{context}

Original prompt: \"{prompt}\"

Simulated answer:
Based on the {count} artifact(s) supplied and the prompt \"{prompt}\",
the analysis indicates the system should consider the following:

1. Review of the supplied artifacts
2. Processing with {model} ({vendor}) via the {platform_desc}
3. Generation of a contextualized answer

This is a simulated answer. In production it would be produced by the real {model} model.",
      model = model,
      platform = platform,
      context = context,
      prompt = prompt,
      count = request.artifacts().len(),
      vendor = model.vendor(),
      platform_desc = platform.description(),
    );

    trace!("Synthesized {} chars", text.chars().count());
    text
}

/// Pluggable synthesis step of the processor
pub trait ResponseSynthesizer: Send + Sync
{   fn synthesize(&self, request: &ValidatedRequest) -> String;
}

/// The default synthesizer, backed by [`synthesize`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSynthesizer;

impl ResponseSynthesizer for TemplateSynthesizer
{   fn synthesize(&self, request: &ValidatedRequest) -> String
    {   synthesize(request)
    }
}
