//! Stream normalization
//!
//! Incremental per-provider parsers that converge on one output contract: a
//! sequence of token chunks ending in exactly one terminal event. Frames are
//! only interpreted once they have fully arrived; trailing partial input
//! stays buffered for the next push.

use serde_json::Value;

use super::provider::StreamFraming;
use super::types::NormalizedChunk;

/// Interpretation of one complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
  /// Frame carried a non-empty token
  Token(String),

  /// Frame is the provider's terminal marker
  Terminal,

  /// Complete frame with nothing for the caller (control event, empty delta)
  Empty,

  /// Payload does not parse as complete JSON; expected at chunk boundaries
  Incomplete,
}

/// Incremental normalizer state for one upstream stream.
pub struct StreamNormalizer {
  framing: StreamFraming,
  buffer: Vec<u8>,
  done: bool,
}

impl StreamNormalizer {
  pub fn new(framing: StreamFraming) -> Self {
    Self {
      framing,
      buffer: Vec::new(),
      done: false,
    }
  }

  /// True once a terminal chunk has been emitted.
  pub fn is_done(&self) -> bool {
    self.done
  }

  /// Feeds raw upstream bytes and returns the chunks they complete.
  ///
  /// Input after the terminal chunk is ignored.
  pub fn push(&mut self, bytes: &[u8]) -> Vec<NormalizedChunk> {
    if self.done {
      return Vec::new();
    }
    self.buffer.extend_from_slice(bytes);

    let separator = frame_separator(self.framing);
    let mut chunks = Vec::new();
    while let Some(idx) = find_subslice(&self.buffer, separator) {
      let frame = String::from_utf8_lossy(&self.buffer[..idx]).into_owned();
      self.buffer.drain(..idx + separator.len());
      if self.apply(&frame, &mut chunks) {
        self.buffer.clear();
        break;
      }
    }
    chunks
  }

  /// Signals the end of the upstream body.
  ///
  /// Interprets a trailing unterminated frame if one is buffered, then
  /// closes the stream with an implicit Done when no terminal marker was
  /// seen upstream.
  pub fn finish(&mut self) -> Vec<NormalizedChunk> {
    if self.done {
      return Vec::new();
    }

    let mut chunks = Vec::new();
    if !self.buffer.is_empty() {
      let trailing = String::from_utf8_lossy(&self.buffer).into_owned();
      self.buffer.clear();
      self.apply(&trailing, &mut chunks);
    }
    if !self.done {
      self.done = true;
      chunks.push(NormalizedChunk::Done);
    }
    chunks
  }

  /// Returns true when the frame was terminal.
  fn apply(&mut self, frame: &str, chunks: &mut Vec<NormalizedChunk>) -> bool {
    match interpret_frame(self.framing, frame) {
      FrameOutcome::Token(token) => {
        chunks.push(NormalizedChunk::Token(token));
        false
      }
      FrameOutcome::Terminal => {
        self.done = true;
        chunks.push(NormalizedChunk::Done);
        true
      }
      FrameOutcome::Empty | FrameOutcome::Incomplete => false,
    }
  }
}

fn frame_separator(framing: StreamFraming) -> &'static [u8] {
  match framing {
    StreamFraming::Cohere => b"\n\n",
    _ => b"\n",
  }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
  haystack.windows(needle.len()).position(|window| window == needle)
}

/// Interprets one complete frame per the provider's framing rules.
pub fn interpret_frame(framing: StreamFraming, frame: &str) -> FrameOutcome {
  match framing {
    StreamFraming::OpenAi => interpret_openai_line(frame),
    StreamFraming::Anthropic => interpret_anthropic_line(frame),
    StreamFraming::Google => interpret_google_line(frame),
    StreamFraming::Cohere => interpret_cohere_event(frame),
    StreamFraming::HuggingFace => interpret_huggingface_line(frame),
  }
}

fn data_payload(line: &str) -> Option<&str> {
  line.strip_prefix("data: ").map(str::trim)
}

fn interpret_openai_line(line: &str) -> FrameOutcome {
  let Some(payload) = data_payload(line) else {
    return FrameOutcome::Empty;
  };
  if payload == "[DONE]" {
    return FrameOutcome::Terminal;
  }
  if payload.is_empty() {
    return FrameOutcome::Empty;
  }
  // Only parse payloads that look structurally complete.
  if !payload.starts_with('{') || !payload.ends_with('}') {
    return FrameOutcome::Incomplete;
  }
  match serde_json::from_str::<Value>(payload) {
    Ok(value) => openai_token(&value).map_or(FrameOutcome::Empty, FrameOutcome::Token),
    Err(_) => FrameOutcome::Incomplete,
  }
}

fn interpret_anthropic_line(line: &str) -> FrameOutcome {
  let Some(payload) = data_payload(line) else {
    return FrameOutcome::Empty;
  };
  if payload == "[DONE]" {
    return FrameOutcome::Terminal;
  }
  if payload.is_empty() {
    return FrameOutcome::Empty;
  }
  match serde_json::from_str::<Value>(payload) {
    Ok(value) => anthropic_token(&value).map_or(FrameOutcome::Empty, FrameOutcome::Token),
    Err(_) => FrameOutcome::Incomplete,
  }
}

fn interpret_google_line(line: &str) -> FrameOutcome {
  let Some(payload) = data_payload(line) else {
    return FrameOutcome::Empty;
  };
  if payload.is_empty() {
    return FrameOutcome::Empty;
  }
  match serde_json::from_str::<Value>(payload) {
    Ok(value) => google_token(&value).map_or(FrameOutcome::Empty, FrameOutcome::Token),
    Err(_) => FrameOutcome::Incomplete,
  }
}

fn interpret_cohere_event(event: &str) -> FrameOutcome {
  let mut event_type = "";
  let mut data = "";
  for line in event.lines() {
    if let Some(rest) = line.strip_prefix("event: ") {
      event_type = rest.trim();
    } else if let Some(rest) = line.strip_prefix("data: ") {
      data = rest.trim();
    }
  }

  if event_type == "content-delta" && !data.is_empty() {
    return match serde_json::from_str::<Value>(data) {
      Ok(value) => cohere_token(&value).map_or(FrameOutcome::Empty, FrameOutcome::Token),
      Err(_) => FrameOutcome::Incomplete,
    };
  }
  if data == "[DONE]" {
    return FrameOutcome::Terminal;
  }
  FrameOutcome::Empty
}

fn interpret_huggingface_line(line: &str) -> FrameOutcome {
  let line = line.trim();
  if line.is_empty() {
    return FrameOutcome::Empty;
  }
  let Ok(value) = serde_json::from_str::<Value>(line) else {
    return FrameOutcome::Incomplete;
  };

  if let Some(token) = value
    .get("token")
    .and_then(|token| token.get("text"))
    .and_then(Value::as_str)
  {
    if !token.is_empty() {
      return FrameOutcome::Token(token.to_string());
    }
  }

  match value.get("generated_text").and_then(Value::as_str) {
    Some(text) if !text.is_empty() => FrameOutcome::Terminal,
    _ => FrameOutcome::Empty,
  }
}

fn openai_token(value: &Value) -> Option<String> {
  let token = value
    .get("choices")?
    .as_array()?
    .first()?
    .get("delta")?
    .get("content")?
    .as_str()?;
  (!token.is_empty()).then(|| token.to_string())
}

fn anthropic_token(value: &Value) -> Option<String> {
  let token = value.get("delta")?.get("text")?.as_str()?;
  (!token.is_empty()).then(|| token.to_string())
}

fn google_token(value: &Value) -> Option<String> {
  let candidates = value.get("candidates")?.as_array()?;
  let parts = candidates.first()?.get("content")?.get("parts")?.as_array()?;
  let token = parts.first()?.get("text")?.as_str()?;
  (!token.is_empty()).then(|| token.to_string())
}

fn cohere_token(value: &Value) -> Option<String> {
  let token = value
    .get("delta")?
    .get("message")?
    .get("content")?
    .get("text")?
    .as_str()?;
  (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn token(text: &str) -> NormalizedChunk {
    NormalizedChunk::Token(text.to_string())
  }

  /// Runs a full body through a fresh normalizer in one push.
  fn run_whole(framing: StreamFraming, body: &str) -> Vec<NormalizedChunk> {
    let mut normalizer = StreamNormalizer::new(framing);
    let mut chunks = normalizer.push(body.as_bytes());
    chunks.extend(normalizer.finish());
    chunks
  }

  /// Runs a full body through a fresh normalizer one byte at a time.
  fn run_byte_by_byte(framing: StreamFraming, body: &str) -> Vec<NormalizedChunk> {
    let mut normalizer = StreamNormalizer::new(framing);
    let mut chunks = Vec::new();
    for byte in body.as_bytes() {
      chunks.extend(normalizer.push(&[*byte]));
    }
    chunks.extend(normalizer.finish());
    chunks
  }

  fn assert_reassembly(framing: StreamFraming, body: &str, expected: &[NormalizedChunk]) {
    assert_eq!(run_whole(framing, body), expected, "whole-body run");
    assert_eq!(run_byte_by_byte(framing, body), expected, "byte-by-byte run");
  }

  #[test]
  fn test_openai_framing_reassembly() {
    let body = concat!(
      "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
      "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
      "data: [DONE]\n\n",
    );
    assert_reassembly(
      StreamFraming::OpenAi,
      body,
      &[token("Hel"), token("lo"), NormalizedChunk::Done],
    );
  }

  #[test]
  fn test_anthropic_framing_reassembly() {
    let body = concat!(
      "event: content_block_delta\n",
      "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\n",
      "event: content_block_delta\n",
      "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\n",
      "data: [DONE]\n\n",
    );
    assert_reassembly(
      StreamFraming::Anthropic,
      body,
      &[token("Hi"), token(" there"), NormalizedChunk::Done],
    );
  }

  #[test]
  fn test_google_framing_ends_without_sentinel() {
    let body = concat!(
      "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"one\"}]}}]}\n\n",
      "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"two\"}]}}]}\n\n",
    );
    assert_reassembly(
      StreamFraming::Google,
      body,
      &[token("one"), token("two"), NormalizedChunk::Done],
    );
  }

  #[test]
  fn test_cohere_framing_reassembly() {
    let body = concat!(
      "event: message-start\ndata: {\"type\":\"message-start\",\"id\":\"x\"}\n\n",
      "event: content-delta\n",
      "data: {\"type\":\"content-delta\",\"delta\":{\"message\":{\"content\":{\"text\":\"Hey\"}}}}\n\n",
      "event: message-end\ndata: {\"type\":\"message-end\"}\n\n",
      "data: [DONE]\n\n",
    );
    assert_reassembly(
      StreamFraming::Cohere,
      body,
      &[token("Hey"), NormalizedChunk::Done],
    );
  }

  #[test]
  fn test_huggingface_framing_reassembly() {
    let body = concat!(
      "{\"token\":{\"id\":1,\"text\":\"Once\"}}\n",
      "{\"token\":{\"id\":2,\"text\":\" upon\"}}\n",
      "{\"generated_text\":\"Once upon\"}\n",
    );
    assert_reassembly(
      StreamFraming::HuggingFace,
      body,
      &[token("Once"), token(" upon"), NormalizedChunk::Done],
    );
  }

  #[test]
  fn test_terminal_idempotence() {
    let mut normalizer = StreamNormalizer::new(StreamFraming::OpenAi);
    let chunks = normalizer.push(b"data: [DONE]\n\n");
    assert_eq!(chunks, vec![NormalizedChunk::Done]);
    assert!(normalizer.is_done());

    let after = normalizer.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n");
    assert!(after.is_empty());
    assert!(normalizer.finish().is_empty());
  }

  #[test]
  fn test_frames_after_terminal_in_same_push_are_dropped() {
    let mut normalizer = StreamNormalizer::new(StreamFraming::OpenAi);
    let body = concat!(
      "data: [DONE]\n\n",
      "data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n\n",
    );
    assert_eq!(normalizer.push(body.as_bytes()), vec![NormalizedChunk::Done]);
  }

  #[test]
  fn test_finish_interprets_trailing_frame() {
    // Final line arrives with no trailing newline.
    let mut normalizer = StreamNormalizer::new(StreamFraming::HuggingFace);
    assert!(normalizer.push(b"{\"token\":{\"text\":\"tail\"}}").is_empty());
    assert_eq!(
      normalizer.finish(),
      vec![token("tail"), NormalizedChunk::Done]
    );
  }

  #[test]
  fn test_multibyte_token_split_across_pushes() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo…\"}}]}\n\ndata: [DONE]\n\n";
    assert_reassembly(
      StreamFraming::OpenAi,
      body,
      &[token("héllo…"), NormalizedChunk::Done],
    );
  }

  #[test]
  fn test_openai_structural_precheck() {
    assert_eq!(
      interpret_frame(
        StreamFraming::OpenAi,
        "data: {\"choices\":[{\"delta\":{\"content\":\"x\""
      ),
      FrameOutcome::Incomplete
    );
    // Balanced braces but invalid JSON still counts as incomplete.
    assert_eq!(
      interpret_frame(StreamFraming::OpenAi, "data: {\"choices\":]}"),
      FrameOutcome::Incomplete
    );
  }

  #[test]
  fn test_non_data_lines_are_empty_not_incomplete() {
    assert_eq!(
      interpret_frame(StreamFraming::OpenAi, ": keepalive comment"),
      FrameOutcome::Empty
    );
    assert_eq!(
      interpret_frame(StreamFraming::Anthropic, "event: message_start"),
      FrameOutcome::Empty
    );
  }

  #[test]
  fn test_empty_delta_content_is_not_emitted() {
    assert_eq!(
      interpret_frame(
        StreamFraming::OpenAi,
        "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}"
      ),
      FrameOutcome::Empty
    );
    assert_eq!(
      interpret_frame(
        StreamFraming::OpenAi,
        "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}"
      ),
      FrameOutcome::Empty
    );
  }

  #[test]
  fn test_cohere_non_delta_events_skipped() {
    assert_eq!(
      interpret_frame(
        StreamFraming::Cohere,
        "event: citation-start\ndata: {\"type\":\"citation-start\"}"
      ),
      FrameOutcome::Empty
    );
  }

  #[test]
  fn test_huggingface_non_json_lines_skipped() {
    assert_eq!(
      interpret_frame(StreamFraming::HuggingFace, "not json at all"),
      FrameOutcome::Incomplete
    );
    let mut normalizer = StreamNormalizer::new(StreamFraming::HuggingFace);
    let chunks = normalizer.push(b"not json at all\n{\"token\":{\"text\":\"ok\"}}\n");
    assert_eq!(chunks, vec![token("ok")]);
  }

  #[test]
  fn test_huggingface_generated_text_beats_empty_token() {
    assert_eq!(
      interpret_frame(
        StreamFraming::HuggingFace,
        "{\"token\":{\"text\":\"\"},\"generated_text\":\"full answer\"}"
      ),
      FrameOutcome::Terminal
    );
  }
}
