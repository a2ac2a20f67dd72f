//! Request and response types for the Larder API.
//!
//! These types mirror the server's API contract.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Envelope
// ─────────────────────────────────────────────────────────────────────────────

/// Standard response envelope wrapping every successful payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded from the server's point of view.
    pub success: bool,
    /// The payload. Absent when `success` is false. The explicit default
    /// path keeps the derive from requiring `T: Default`.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Optional message accompanying a `success=false` envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// User profile
// ─────────────────────────────────────────────────────────────────────────────

/// Diet type selected in the user's dietary preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DietType {
    #[default]
    Omnivore,
    Vegetarian,
    Vegan,
    Pescatarian,
    Keto,
    Paleo,
    GlutenFree,
}

/// Macro-nutrient targets in grams per day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MacroTargets {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Monthly budget and how it is weighted across spending categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BudgetPreferences {
    /// Monthly grocery budget in the user's currency.
    pub monthly_budget: f64,
    /// Relative weight per spending category (e.g. "produce" -> 0.3).
    #[serde(default)]
    pub category_weights: HashMap<String, f64>,
}

/// Dietary needs and goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DietaryNeeds {
    #[serde(default)]
    pub diet_type: DietType,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calorie_target: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_targets: Option<MacroTargets>,
    /// Daily water intake goal in milliliters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_goal_ml: Option<u32>,
    #[serde(default)]
    pub avoided_ingredients: Vec<String>,
}

/// Authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User ID.
    pub id: String,
    /// Unique username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Role (e.g. "user", "admin").
    pub role: String,

    /// Height in centimeters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    /// Weight in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    /// Date of birth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    /// Reference to the profile picture (URL or asset id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    /// Number of people in the household.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_size: Option<u32>,
    /// Country of residence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// City of residence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Budget preferences.
    #[serde(default)]
    pub budget: BudgetPreferences,
    /// Dietary needs and goals.
    #[serde(default)]
    pub dietary: DietaryNeeds,
}

/// Shallow-merge patch for [`UserInfo`].
///
/// Every field is optional; `None` leaves the corresponding attribute
/// untouched. Identity fields (id, username) are not patchable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary: Option<DietaryNeeds>,
}

impl UserInfo {
    /// Shallow-merge a patch into this profile.
    pub fn apply(&mut self, patch: UserInfoPatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if patch.height_cm.is_some() {
            self.height_cm = patch.height_cm;
        }
        if patch.weight_kg.is_some() {
            self.weight_kg = patch.weight_kg;
        }
        if patch.date_of_birth.is_some() {
            self.date_of_birth = patch.date_of_birth;
        }
        if patch.profile_picture.is_some() {
            self.profile_picture = patch.profile_picture;
        }
        if patch.household_size.is_some() {
            self.household_size = patch.household_size;
        }
        if patch.country.is_some() {
            self.country = patch.country;
        }
        if patch.city.is_some() {
            self.city = patch.city;
        }
        if let Some(budget) = patch.budget {
            self.budget = budget;
        }
        if let Some(dietary) = patch.dietary {
            self.dietary = dietary;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inventory
// ─────────────────────────────────────────────────────────────────────────────

/// A food item in the user's inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category (e.g. "produce", "dairy", "pantry").
    pub category: String,
    /// Quantity in `unit`s.
    pub quantity: f64,
    /// Unit of measure (e.g. "g", "ml", "pieces").
    pub unit: String,
    /// Expiry date, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

/// Request to add an inventory item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

/// Partial update for an inventory item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<NaiveDate>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Resources
// ─────────────────────────────────────────────────────────────────────────────

/// A tip/guide resource shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource ID.
    pub id: String,
    /// Category (e.g. "nutrition", "budgeting").
    pub category: String,
    /// Kind within the category (e.g. "article", "video").
    pub kind: String,
    /// Title.
    pub title: String,
    /// Body or external link.
    pub content: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// A message in the assistant chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message ID.
    pub id: String,
    /// Sender role ("user" or "assistant").
    pub role: String,
    /// Message text.
    pub content: String,
    /// Timestamp (ISO 8601).
    pub timestamp: String,
}

/// Request to send a chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Message text.
    pub content: String,
}

impl SendMessageRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Analytics
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregated spending and nutrition figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalyticsSummary {
    /// Total spend this month.
    pub monthly_spend: f64,
    /// Spend per category this month.
    #[serde(default)]
    pub spend_by_category: HashMap<String, f64>,
    /// Average daily calorie intake this month.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_daily_calories: Option<f64>,
    /// Number of items that expired unused this month.
    #[serde(default)]
    pub items_wasted: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut user = UserInfo {
            id: "u1".into(),
            username: "alice".into(),
            email: "old@example.com".into(),
            role: "user".into(),
            height_cm: Some(170.0),
            weight_kg: Some(65.0),
            date_of_birth: None,
            profile_picture: None,
            household_size: Some(2),
            country: Some("NL".into()),
            city: Some("Utrecht".into()),
            budget: BudgetPreferences::default(),
            dietary: DietaryNeeds::default(),
        };

        user.apply(UserInfoPatch {
            email: Some("new@example.com".into()),
            weight_kg: Some(63.5),
            ..Default::default()
        });

        assert_eq!(user.email, "new@example.com");
        assert_eq!(user.weight_kg, Some(63.5));
        // Untouched fields survive.
        assert_eq!(user.height_cm, Some(170.0));
        assert_eq!(user.city.as_deref(), Some("Utrecht"));
    }

    #[test]
    fn test_envelope_deserializes_without_data() {
        let json = r#"{"success":false,"message":"nope"}"#;
        let env: Envelope<UserInfo> = serde_json::from_str(json).unwrap();
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(env.message.as_deref(), Some("nope"));
    }

    #[test]
    fn test_user_info_defaults_for_missing_preferences() {
        let json = r#"{"id":"u1","username":"alice","email":"a@b.c","role":"user"}"#;
        let user: UserInfo = serde_json::from_str(json).unwrap();
        assert_eq!(user.dietary.diet_type, DietType::Omnivore);
        assert!(user.budget.category_weights.is_empty());
    }
}
