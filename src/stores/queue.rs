use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client;

use super::StoreError;

/// A received message plus the receipt needed to acknowledge it.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub body: String,
    pub receipt: String,
}

/// At-least-once message queue. Messages that are never acked are
/// redelivered by the queue itself; this service applies no local retry
/// bound to them.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn send(&self, body: &str, attributes: &[(String, String)]) -> Result<(), StoreError>;

    async fn receive(&self, max: i32) -> Result<Vec<QueueMessage>, StoreError>;

    async fn ack(&self, receipt: &str) -> Result<(), StoreError>;
}

pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub async fn connect(queue_url: &str) -> Self {
        let config = aws_config::load_from_env().await;
        Self {
            client: Client::new(&config),
            queue_url: queue_url.to_string(),
        }
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send(&self, body: &str, attributes: &[(String, String)]) -> Result<(), StoreError> {
        let mut request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body);

        for (name, value) in attributes {
            let attr = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| StoreError::Backend(format!("message attribute: {e}")))?;
            request = request.message_attributes(name, attr);
        }

        request
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("send message: {e}")))?;
        Ok(())
    }

    async fn receive(&self, max: i32) -> Result<Vec<QueueMessage>, StoreError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(10)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("receive messages: {e}")))?;

        Ok(output
            .messages()
            .iter()
            .filter_map(|m| {
                Some(QueueMessage {
                    body: m.body()?.to_string(),
                    receipt: m.receipt_handle()?.to_string(),
                })
            })
            .collect())
    }

    async fn ack(&self, receipt: &str) -> Result<(), StoreError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt)
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("ack message: {e}")))?;
        Ok(())
    }
}
