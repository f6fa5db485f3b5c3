//! # Live chat
//!
//! A [`ChatSession`] is one open conversation with a customer contact. Sending
//! a message records it as a customer turn and, when the persona has
//! auto-reply enabled, asks the [`ReplyGenerator`] for an answer and records
//! that too.
//!
//! Contacts are a fixed demo roster ([`demo_contacts`]); [`filter_contacts`]
//! narrows them with a free-text query. [`overview_stats`] holds the fixed
//! figures of the dashboard overview.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    conversation::{ConversationTurn, Origin},
    notify::{Notifier, ToastKind},
    persona::BotConfig,
    reply::ReplyGenerator,
};

/// A customer in the contact roster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    /// Preview of the most recent message.
    pub last_message: String,
    /// Human-readable time of the last activity.
    pub last_seen: String,
}

impl Contact {
    fn new(id: &str, name: &str, last_message: &str, last_seen: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            last_message: last_message.to_string(),
            last_seen: last_seen.to_string(),
        }
    }
}

pub fn demo_contacts() -> Vec<Contact> {
    vec![
        Contact::new("1", "Ricardo Santos", "Disponibilidade do iPhone 15...", "14:30"),
        Contact::new("2", "Ana Oliveira", "Obrigada pelo atendimento!", "12:15"),
        Contact::new("3", "Marcos Vale", "Preciso de ajuda com o envio.", "Ontem"),
        Contact::new("4", "Sofia Costa", "Qual o valor do MacBook?", "2 dias"),
    ]
}

/// One figure of the dashboard overview.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatCard {
    pub label: &'static str,
    pub value: &'static str,
    pub trend: &'static str,
}

impl StatCard {
    const fn new(label: &'static str, value: &'static str, trend: &'static str) -> Self {
        Self {
            label,
            value,
            trend,
        }
    }
}

pub fn overview_stats() -> [StatCard; 4] {
    [
        StatCard::new("Total de Conversas", "1,284", "+12%"),
        StatCard::new("Interações Bot", "85%", "+5%"),
        StatCard::new("Tempo de Resposta", "1.2m", "-15%"),
        StatCard::new("Taxa de Conversão", "24.8%", "+8.4%"),
    ]
}

/// Contacts whose name or last message contains `query`, ignoring case.
pub fn filter_contacts<'c>(contacts: &'c [Contact], query: &str) -> Vec<&'c Contact> {
    let query = query.to_lowercase();
    contacts
        .iter()
        .filter(|contact| {
            contact.name.to_lowercase().contains(&query)
                || contact.last_message.to_lowercase().contains(&query)
        })
        .collect()
}

/// An open conversation with one contact.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub contact: Contact,
    turns: Vec<ConversationTurn>,
}

impl ChatSession {
    pub fn new(contact: Contact) -> Self {
        Self {
            contact,
            turns: Vec::new(),
        }
    }

    /// Start with the sample exchange shown when a chat is opened.
    pub fn seeded(contact: Contact) -> Self {
        let now = Utc::now();
        Self {
            contact,
            turns: vec![
                ConversationTurn::at(
                    Origin::Customer,
                    "Olá, gostaria de saber se vocês têm o novo iPhone disponível?",
                    now - Duration::seconds(3600),
                ),
                ConversationTurn::at(
                    Origin::Assistant,
                    "Olá! Sou o assistente da Applemar. Sim, temos o novo modelo disponível em \
                     stock nas cores Preto e Titânio. Gostaria de mais detalhes?",
                    now - Duration::seconds(3500),
                ),
            ],
        }
    }

    /// Open a seeded chat with `contact` and announce it.
    pub fn open(contact: Contact, notifier: &dyn Notifier) -> Self {
        let session = Self::seeded(contact);
        notifier.notify(
            &format!("Chat com {} carregado", session.contact.name),
            ToastKind::Info,
        );
        session
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Record a customer message and, if auto-reply is on, the bot's answer.
    ///
    /// Blank input is ignored and records nothing. Returns the assistant turn
    /// when one was produced.
    pub async fn send(
        &mut self,
        text: &str,
        generator: &ReplyGenerator,
        bot: &BotConfig,
    ) -> Option<&ConversationTurn> {
        if text.trim().is_empty() {
            return None;
        }

        let history_len = self.turns.len();
        self.turns.push(ConversationTurn::customer(text));

        if !bot.auto_reply_enabled {
            tracing::debug!("Auto-reply disabled, {} left unanswered", self.contact.name);
            return None;
        }

        let reply = generator
            .generate_reply(text, &self.turns[..history_len], bot)
            .await;
        self.turns.push(ConversationTurn::assistant(reply));
        self.turns.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GenerationBackend, GenerationError, GenerationRequest};
    use crate::conversation::HistoryWindow;
    use crate::notify::RecordingNotifier;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct EchoBackend {
        requests: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Option<String>, GenerationError> {
            self.requests.lock().unwrap().push(request.clone());
            let last = request.contents.last().map(|c| c.text.clone());
            Ok(last.map(|text| format!("eco: {text}")))
        }
    }

    fn generator(backend: Arc<EchoBackend>) -> ReplyGenerator {
        ReplyGenerator::new(backend).with_history_window(HistoryWindow::unbounded())
    }

    #[test]
    fn test_filter_contacts_matches_name_and_message() {
        let contacts = demo_contacts();

        let by_name: Vec<&str> = filter_contacts(&contacts, "ana")
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(by_name, vec!["Ana Oliveira"]);

        let by_message: Vec<&str> = filter_contacts(&contacts, "MACBOOK")
            .into_iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(by_message, vec!["Sofia Costa"]);

        assert_eq!(filter_contacts(&contacts, "").len(), 4);
        assert!(filter_contacts(&contacts, "zzz").is_empty());
    }

    #[test]
    fn test_open_announces_loaded_chat() {
        let notifier = RecordingNotifier::new();
        let session = ChatSession::open(demo_contacts().remove(1), &notifier);

        assert_eq!(session.turns().len(), 2);
        assert_eq!(
            notifier.messages(),
            vec![("Chat com Ana Oliveira carregado".to_string(), ToastKind::Info)]
        );
    }

    #[test]
    fn test_overview_stats() {
        let stats = overview_stats();
        assert_eq!(stats[0].label, "Total de Conversas");
        assert_eq!(stats[0].value, "1,284");
        assert_eq!(stats[3].value, "24.8%");
        assert_eq!(stats[2].trend, "-15%");
    }

    #[tokio::test]
    async fn test_send_records_both_turns() {
        let backend = Arc::new(EchoBackend::default());
        let mut session = ChatSession::seeded(demo_contacts().remove(0));

        let reply = session
            .send("Qual o preço?", &generator(backend.clone()), &BotConfig::default())
            .await
            .cloned();

        assert_eq!(reply.map(|t| t.text).as_deref(), Some("eco: Qual o preço?"));
        assert_eq!(session.turns().len(), 4);
        assert_eq!(session.turns()[2].origin, Origin::Customer);
        assert_eq!(session.turns()[3].origin, Origin::Assistant);

        // the new message is the utterance, not part of the history
        let request = backend.requests.lock().unwrap()[0].clone();
        assert_eq!(request.contents.len(), 3);
    }

    #[tokio::test]
    async fn test_send_without_auto_reply_only_records_customer() {
        let backend = Arc::new(EchoBackend::default());
        let mut session = ChatSession::new(demo_contacts().remove(1));
        let bot = BotConfig {
            auto_reply_enabled: false,
            ..BotConfig::default()
        };

        let reply = session.send("Olá", &generator(backend.clone()), &bot).await;

        assert!(reply.is_none());
        assert_eq!(session.turns().len(), 1);
        assert!(backend.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_ignores_blank_input() {
        let backend = Arc::new(EchoBackend::default());
        let mut session = ChatSession::new(demo_contacts().remove(2));

        let reply = session
            .send("  \n\t", &generator(backend.clone()), &BotConfig::default())
            .await;

        assert!(reply.is_none());
        assert!(session.turns().is_empty());
        assert!(backend.requests.lock().unwrap().is_empty());
    }
}
