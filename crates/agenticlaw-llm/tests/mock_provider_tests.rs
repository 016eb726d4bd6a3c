use agenticlaw_llm::{LlmMessage, LlmProvider, MockLlmProvider};

#[tokio::test]
async fn mock_provider_replays_scripted_responses_in_order() {
    let provider = MockLlmProvider::new(vec![
        agenticlaw_llm::LlmResponse {
            content: Some("first".to_string()),
            ..Default::default()
        },
        agenticlaw_llm::LlmResponse {
            content: Some("second".to_string()),
            ..Default::default()
        },
    ]);

    let messages = vec![LlmMessage::new("user", "hi")];
    let first = provider
        .chat_completion("mock-model", None, &messages, &[])
        .await
        .unwrap();
    assert_eq!(first.content.as_deref(), Some("first"));

    let second = provider
        .chat_completion("mock-model", None, &messages, &[])
        .await
        .unwrap();
    assert_eq!(second.content.as_deref(), Some("second"));
    assert_eq!(provider.call_count(), 2);
}
