use std::io::Write;

use anyhow::Result;
use deepchat_shared::{ChatResult, FragmentStream, StreamEvent, StreamTranscript};
use futures_util::StreamExt;

pub fn print_result<W: Write>(out: &mut W, result: &ChatResult) -> Result<()> {
    writeln!(out, "Response:{}", result.text_or_sentinel())?;
    Ok(())
}

/// Prints the role once on its own line, then content deltas as they arrive
/// without inserting line breaks.
pub async fn print_stream<W: Write>(out: &mut W, mut stream: FragmentStream) -> Result<StreamTranscript> {
    let mut transcript = StreamTranscript::new();
    while let Some(fragment) = stream.next().await {
        for event in transcript.apply(fragment?) {
            match event {
                StreamEvent::Role(role) => writeln!(out, "Role: {}", role)?,
                StreamEvent::Content(delta) => {
                    write!(out, "{}", delta)?;
                    out.flush()?;
                }
            }
        }
    }
    writeln!(out)?;
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepchat_shared::{ChatError, MessageRole, StreamFragment};
    use futures_util::stream;

    fn fragments(items: Vec<Result<StreamFragment, ChatError>>) -> FragmentStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn role_on_own_line_then_inline_content() {
        let mut out = Vec::new();
        let transcript = print_stream(
            &mut out,
            fragments(vec![
                Ok(StreamFragment::role(MessageRole::Assistant)),
                Ok(StreamFragment::content("Hi")),
                Ok(StreamFragment::default()),
                Ok(StreamFragment::content(" there")),
            ]),
        )
        .await
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Role: assistant\nHi there\n");
        assert_eq!(transcript.content, "Hi there");
    }

    #[tokio::test]
    async fn stream_error_is_returned() {
        let mut out = Vec::new();
        let err = print_stream(
            &mut out,
            fragments(vec![
                Ok(StreamFragment::content("par")),
                Err(ChatError::Backend("reset".into())),
            ]),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "reset");
        assert_eq!(String::from_utf8(out).unwrap(), "par");
    }

    #[test]
    fn blocking_result_is_prefixed() {
        let mut out = Vec::new();
        print_result(&mut out, &ChatResult::new("42")).unwrap();
        print_result(&mut out, &ChatResult::empty()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Response:42\nResponse:No response received from the model.\n"
        );
    }
}
