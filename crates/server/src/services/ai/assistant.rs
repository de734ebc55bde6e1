//! Prompting, parsing and fallbacks for each AI feature.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::instrument;

use super::types::{
    ChatRole, ChatbotReply, ChatbotRequest, CrossSell, CrossSellRequest, PriceAdjustment,
    PricingAdvice, PricingRequest, Recommendation, Recommendations, RecommendationsRequest,
    SearchIntent, SearchRequest, Suggestion,
};
use super::{AiError, AiModel, extract_json};
use crate::services::fallback::{Outcome, with_fallback};

/// Most chat turns included in a prompt.
const MAX_HISTORY_TURNS: usize = 10;

const SYSTEM_PERSONA: &str = "Sen NeYisek.com yemek sipariş platformunun yardımcı asistanısın. \
     Kısa, samimi ve Türkçe yanıt ver.";

/// AI features with deterministic fallbacks.
#[derive(Clone)]
pub struct AiService {
    model: Option<Arc<dyn AiModel>>,
}

impl AiService {
    /// Create the service. `None` means every call falls back.
    #[must_use]
    pub fn new(model: Option<Arc<dyn AiModel>>) -> Self {
        Self { model }
    }

    /// Whether a model is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let model = self.model.as_ref().ok_or(AiError::NotConfigured)?;
        model.generate(prompt).await
    }

    async fn generate_json<T: serde::de::DeserializeOwned>(
        &self,
        prompt: &str,
    ) -> Result<T, AiError> {
        let text = self.generate(prompt).await?;
        extract_json(&text)
    }

    /// Answer a customer message.
    #[instrument(skip(self, request), fields(history = request.history.len()))]
    pub async fn chatbot(&self, request: &ChatbotRequest) -> Outcome<ChatbotReply> {
        let prompt = chatbot_prompt(request);
        with_fallback(
            "ai.chatbot",
            async {
                let reply = self.generate(&prompt).await?;
                let reply = reply.trim();
                if reply.is_empty() {
                    return Err(AiError::EmptyResponse);
                }
                Ok(ChatbotReply {
                    reply: reply.to_string(),
                })
            },
            || fallback_chat_reply(&request.message),
        )
        .await
    }

    /// Suggest dishes for a customer.
    #[instrument(skip(self, request), fields(user_id = ?request.user_id))]
    pub async fn recommendations(
        &self,
        request: &RecommendationsRequest,
    ) -> Outcome<Recommendations> {
        let limit = request.effective_limit();
        let prompt = recommendations_prompt(request, limit);
        with_fallback(
            "ai.recommendations",
            async {
                let mut parsed: Recommendations = self.generate_json(&prompt).await?;
                parsed.recommendations.truncate(limit);
                if parsed.recommendations.is_empty() {
                    return Err(AiError::EmptyResponse);
                }
                Ok(parsed)
            },
            || fallback_recommendations(limit),
        )
        .await
    }

    /// Interpret a free-text search query.
    #[instrument(skip(self, request))]
    pub async fn search(&self, request: &SearchRequest) -> Outcome<SearchIntent> {
        let prompt = search_prompt(&request.query);
        with_fallback(
            "ai.search",
            self.generate_json::<SearchIntent>(&prompt),
            || fallback_search(&request.query),
        )
        .await
    }

    /// Suggest add-ons for a cart.
    #[instrument(skip(self, request), fields(items = request.cart_items.len()))]
    pub async fn cross_sell(&self, request: &CrossSellRequest) -> Outcome<CrossSell> {
        let prompt = cross_sell_prompt(request);
        with_fallback(
            "ai.cross_sell",
            async {
                let parsed: CrossSell = self.generate_json(&prompt).await?;
                if parsed.suggestions.is_empty() {
                    return Err(AiError::EmptyResponse);
                }
                Ok(parsed)
            },
            || fallback_cross_sell(request),
        )
        .await
    }

    /// Suggest menu price adjustments.
    #[instrument(skip(self, request), fields(restaurant_id = ?request.restaurant_id))]
    pub async fn pricing(&self, request: &PricingRequest) -> Outcome<PricingAdvice> {
        let prompt = pricing_prompt(request);
        with_fallback(
            "ai.pricing",
            self.generate_json::<PricingAdvice>(&prompt),
            || fallback_pricing(request),
        )
        .await
    }
}

// =============================================================================
// Prompts
// =============================================================================

fn chatbot_prompt(request: &ChatbotRequest) -> String {
    let mut prompt = format!("{SYSTEM_PERSONA}\n\n");

    if let Some(context) = &request.context {
        prompt.push_str("Bağlam:\n");
        if let Some(name) = &context.user_name {
            let _ = writeln!(prompt, "- Kullanıcı adı: {name}");
        }
        if let Some(page) = &context.current_page {
            let _ = writeln!(prompt, "- Bulunduğu sayfa: {page}");
        }
        if let Some(count) = context.cart_item_count {
            let _ = writeln!(prompt, "- Sepetteki ürün sayısı: {count}");
        }
        if let Some(restaurant) = &context.restaurant_name {
            let _ = writeln!(prompt, "- Restoran: {restaurant}");
        }
        prompt.push('\n');
    }

    let skip = request.history.len().saturating_sub(MAX_HISTORY_TURNS);
    if request.history.len() > skip {
        prompt.push_str("Önceki konuşma:\n");
        for turn in request.history.iter().skip(skip) {
            let who = match turn.role {
                ChatRole::User => "Kullanıcı",
                ChatRole::Assistant => "Asistan",
            };
            let _ = writeln!(prompt, "{who}: {}", turn.content);
        }
        prompt.push('\n');
    }

    let _ = write!(prompt, "Kullanıcı: {}\nAsistan:", request.message.trim());
    prompt
}

fn recommendations_prompt(request: &RecommendationsRequest, limit: usize) -> String {
    let mut prompt = format!(
        "{SYSTEM_PERSONA}\n\nBir müşteri için {limit} yemek önerisi hazırla.\n"
    );
    if !request.preferences.is_empty() {
        let _ = writeln!(prompt, "Tercihleri: {}", request.preferences.join(", "));
    }
    if !request.recent_orders.is_empty() {
        let _ = writeln!(
            prompt,
            "Son siparişleri: {}",
            request.recent_orders.join(", ")
        );
    }
    prompt.push_str(
        "Yanıtı yalnızca şu JSON biçiminde ver: \
         {\"recommendations\": [{\"name\": \"...\", \"reason\": \"...\", \"category\": \"...\"}]}",
    );
    prompt
}

fn search_prompt(query: &str) -> String {
    format!(
        "{SYSTEM_PERSONA}\n\nKullanıcının yemek arama sorgusunu çözümle: \"{}\"\n\
         Yanıtı yalnızca şu JSON biçiminde ver: \
         {{\"intent\": \"search|order|browse\", \"keywords\": [\"...\"], \
         \"cuisine\": \"... veya null\", \"maxPrice\": sayı veya null}}",
        query.trim()
    )
}

fn cross_sell_prompt(request: &CrossSellRequest) -> String {
    let mut prompt = format!("{SYSTEM_PERSONA}\n\nMüşterinin sepeti:\n");
    for item in &request.cart_items {
        let _ = writeln!(prompt, "- {} x{} ({})", item.name, item.quantity, item.price);
    }
    prompt.push_str(
        "Sepete uygun en fazla 3 ek ürün öner. Yanıtı yalnızca şu JSON biçiminde ver: \
         {\"suggestions\": [{\"name\": \"...\", \"reason\": \"...\"}]}",
    );
    prompt
}

fn pricing_prompt(request: &PricingRequest) -> String {
    let mut prompt = format!(
        "{SYSTEM_PERSONA}\n\nTalep seviyesi: {}\nMenü:\n",
        request.demand_level.label()
    );
    for item in &request.items {
        let _ = writeln!(prompt, "- {}: {}", item.name, item.price);
    }
    prompt.push_str(
        "Her ürün için fiyat önerisi yap. Yanıtı yalnızca şu JSON biçiminde ver: \
         {\"strategy\": \"...\", \"adjustments\": [{\"name\": \"...\", \"currentPrice\": sayı, \
         \"suggestedPrice\": sayı, \"reason\": \"...\"}]}",
    );
    prompt
}

// =============================================================================
// Fallbacks
// =============================================================================

fn fallback_chat_reply(message: &str) -> ChatbotReply {
    let lower = message.to_lowercase();
    let reply = if lower.contains("sipariş") {
        "Siparişlerinizin durumunu 'Siparişlerim' sayfasından takip edebilirsiniz. \
         Bir sorun varsa destek ekibimiz size yardımcı olacaktır."
    } else if lower.contains("teslimat") || lower.contains("kurye") {
        "Teslimat süreleri restorana ve yoğunluğa göre genellikle 30-45 dakika arasındadır."
    } else if lower.contains("ödeme") {
        "Kapıda nakit, kapıda kart veya online ödeme seçeneklerini kullanabilirsiniz."
    } else {
        "Üzgünüm, şu anda yardımcı olamıyorum. Lütfen daha sonra tekrar deneyin \
         veya destek ekibimizle iletişime geçin."
    };
    ChatbotReply {
        reply: reply.to_string(),
    }
}

const POPULAR_DISHES: &[(&str, &str, &str)] = &[
    ("Adana Kebap", "En çok sipariş edilen lezzetlerden", "Kebap"),
    ("Lahmacun", "Hızlı ve doyurucu bir klasik", "Pide & Lahmacun"),
    ("Mantı", "Ev yapımı tadında", "Ev Yemekleri"),
    ("İskender", "Tereyağlı ve yoğurtlu bir favori", "Kebap"),
    ("Künefe", "Yemeğin üstüne tatlı bir kapanış", "Tatlı"),
    ("Karışık Pide", "Paylaşmak için ideal", "Pide & Lahmacun"),
    ("Mercimek Çorbası", "Hafif ve sıcak bir başlangıç", "Çorba"),
    ("Tavuk Döner", "Her saate uygun", "Döner"),
    ("Çiğ Köfte Dürüm", "Acı sevenlere", "Dürüm"),
    ("Sütlaç", "Fırında, hafif bir tatlı", "Tatlı"),
];

fn fallback_recommendations(limit: usize) -> Recommendations {
    Recommendations {
        recommendations: POPULAR_DISHES
            .iter()
            .take(limit)
            .map(|(name, reason, category)| Recommendation {
                name: (*name).to_string(),
                reason: (*reason).to_string(),
                category: (*category).to_string(),
            })
            .collect(),
    }
}

fn fallback_search(query: &str) -> SearchIntent {
    let keywords = query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>();
    SearchIntent {
        intent: "search".to_string(),
        keywords,
        cuisine: None,
        max_price: None,
    }
}

const ADD_ONS: &[(&str, &str)] = &[
    ("Ayran", "Yemeğinizin yanına serinletici bir içecek"),
    ("Künefe", "Tatlı bir kapanış için"),
    ("Mevsim Salata", "Hafif bir eşlikçi"),
    ("Su", "Her siparişe uygun"),
];

fn fallback_cross_sell(request: &CrossSellRequest) -> CrossSell {
    let in_cart = |name: &str| {
        request
            .cart_items
            .iter()
            .any(|item| item.name.to_lowercase() == name.to_lowercase())
    };

    let mut suggestions: Vec<Suggestion> = ADD_ONS
        .iter()
        .filter(|(name, _)| !in_cart(name))
        .take(3)
        .map(|(name, reason)| Suggestion {
            name: (*name).to_string(),
            reason: (*reason).to_string(),
        })
        .collect();

    if suggestions.is_empty() {
        suggestions = ADD_ONS
            .iter()
            .take(1)
            .map(|(name, reason)| Suggestion {
                name: (*name).to_string(),
                reason: (*reason).to_string(),
            })
            .collect();
    }

    CrossSell { suggestions }
}

fn fallback_pricing(request: &PricingRequest) -> PricingAdvice {
    PricingAdvice {
        strategy: "Mevcut fiyatların korunması önerilir".to_string(),
        adjustments: request
            .items
            .iter()
            .map(|item| PriceAdjustment {
                name: item.name.clone(),
                current_price: item.price,
                suggested_price: item.price,
                reason: "Fiyat analizi şu anda yapılamıyor".to_string(),
            })
            .collect(),
    }
}
