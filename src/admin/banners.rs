use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{now_rfc3339, require_id, AdminError, AdminOutcome};
use crate::api::{ApiError, Query, Table, TableClient};
use crate::models::{decode_rows, HeroBanner, DEFAULT_BANNER_BG, DEFAULT_BANNER_TEXT};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "image_url")]
    pub image_url: String,
    #[serde(default = "default_bg", alias = "bg_color")]
    pub bg_color: String,
    #[serde(default = "default_text", alias = "text_color")]
    pub text_color: String,
    #[serde(default, alias = "action_text")]
    pub action_text: String,
    #[serde(default, alias = "action_link")]
    pub action_link: String,
    #[serde(default)]
    pub order: i32,
}

fn default_bg() -> String {
    DEFAULT_BANNER_BG.to_string()
}

fn default_text() -> String {
    DEFAULT_BANNER_TEXT.to_string()
}

impl Default for BannerForm {
    fn default() -> Self {
        BannerForm {
            title: String::new(),
            description: String::new(),
            image_url: String::new(),
            bg_color: default_bg(),
            text_color: default_text(),
            action_text: String::new(),
            action_link: String::new(),
            order: 0,
        }
    }
}

impl BannerForm {
    fn to_row(&self) -> Result<serde_json::Value, AdminError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AdminError::Invalid("Please enter a banner title".into()));
        }
        Ok(json!({
            "title": title,
            "description": self.description.trim(),
            "image_url": self.image_url.trim(),
            "bg_color": colour_or(&self.bg_color, DEFAULT_BANNER_BG),
            "text_color": colour_or(&self.text_color, DEFAULT_BANNER_TEXT),
            "action_text": self.action_text.trim(),
            "action_link": self.action_link.trim(),
            "order": self.order,
        }))
    }
}

fn colour_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

fn merge(mut row: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    if let (Some(target), serde_json::Value::Object(extra)) = (row.as_object_mut(), extra) {
        target.extend(extra);
    }
    row
}

/// Every banner in display order, active or not.
pub async fn list_banners<C: TableClient>(client: &C) -> Result<Vec<HeroBanner>, AdminError> {
    let rows = client
        .select(&Query::table(Table::HeroBanners).order("order", true))
        .await
        .map_err(AdminError::store("Failed to load banners"))?;
    decode_rows(Table::HeroBanners.as_str(), rows)
        .map_err(|e| AdminError::store("Failed to load banners")(ApiError::Decode(e)))
}

pub async fn create_banner<C: TableClient>(
    client: &C,
    form: &BannerForm,
) -> Result<AdminOutcome<HeroBanner>, AdminError> {
    let row = merge(form.to_row()?, json!({ "is_active": true }));
    let created = client
        .insert(Table::HeroBanners, row)
        .await
        .map_err(AdminError::store("Failed to save banner"))?;
    let banner: HeroBanner = serde_json::from_value(created).map_err(|e| {
        AdminError::store("Failed to save banner")(ApiError::Decode(e.to_string()))
    })?;
    info!(banner_id = %banner.id, "hero banner created");
    Ok(AdminOutcome::new("Banner added successfully!", banner))
}

pub async fn update_banner<C: TableClient>(
    client: &C,
    id: &str,
    form: &BannerForm,
) -> Result<AdminOutcome<()>, AdminError> {
    let id = require_id(id)?;
    let patch = merge(form.to_row()?, json!({ "updated_at": now_rfc3339() }));
    client
        .update(&Query::table(Table::HeroBanners).eq("id", id), patch)
        .await
        .map_err(AdminError::store("Failed to save banner"))?;
    info!(banner_id = %id, "hero banner updated");
    Ok(AdminOutcome::new("Banner updated successfully!", ()))
}

/// Flip visibility from the state the panel last showed. Returns the new
/// state.
pub async fn toggle_active<C: TableClient>(
    client: &C,
    id: &str,
    currently_active: bool,
) -> Result<bool, AdminError> {
    let id = require_id(id)?;
    let next = !currently_active;
    client
        .update(
            &Query::table(Table::HeroBanners).eq("id", id),
            json!({ "is_active": next, "updated_at": now_rfc3339() }),
        )
        .await
        .map_err(AdminError::store("Failed to update banner"))?;
    info!(banner_id = %id, is_active = next, "hero banner toggled");
    Ok(next)
}

pub async fn delete_banner<C: TableClient>(
    client: &C,
    id: &str,
) -> Result<AdminOutcome<()>, AdminError> {
    let id = require_id(id)?;
    client
        .delete(&Query::table(Table::HeroBanners).eq("id", id))
        .await
        .map_err(AdminError::store("Failed to delete banner"))?;
    info!(banner_id = %id, "hero banner deleted");
    Ok(AdminOutcome::new("Banner deleted successfully!", ()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::load_active_banners;
    use crate::testing::MemoryTables;

    fn banner_form(title: &str, order: i32) -> BannerForm {
        BannerForm {
            title: title.into(),
            description: "Fresh off the tawa".into(),
            action_text: "Order now".into(),
            order,
            ..BannerForm::default()
        }
    }

    #[tokio::test]
    async fn create_requires_title_and_starts_active() {
        let tables = MemoryTables::new();
        let err = create_banner(&tables, &banner_form("  ", 0))
            .await
            .expect_err("blank title should fail");
        assert_eq!(err.to_string(), "Please enter a banner title");
        assert_eq!(tables.calls(), 0);

        let outcome = create_banner(&tables, &banner_form("New menu items!", 1))
            .await
            .expect("create");
        assert!(outcome.data.is_active);
        assert_eq!(outcome.data.bg_color, DEFAULT_BANNER_BG);
        assert_eq!(outcome.message, "Banner added successfully!");
    }

    #[tokio::test]
    async fn toggled_off_banner_leaves_shopper_carousel() {
        let tables = MemoryTables::new();
        let first = create_banner(&tables, &banner_form("Second", 2))
            .await
            .expect("create")
            .data;
        create_banner(&tables, &banner_form("First", 1))
            .await
            .expect("create");

        let titles: Vec<String> = list_banners(&tables)
            .await
            .expect("list")
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);

        let active = toggle_active(&tables, &first.id, true).await.expect("toggle");
        assert!(!active);
        let visible = load_active_banners(&tables).await;
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title, "First");

        assert_eq!(list_banners(&tables).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn update_stamps_updated_at_and_delete_removes() {
        let tables = MemoryTables::new();
        let created = create_banner(&tables, &banner_form("Combo deal", 0))
            .await
            .expect("create")
            .data;
        let mut form = banner_form("Combo deal - today only", 0);
        form.bg_color = "".into();
        update_banner(&tables, &created.id, &form)
            .await
            .expect("update");

        let stored = list_banners(&tables).await.expect("list");
        assert_eq!(stored[0].title, "Combo deal - today only");
        assert_eq!(stored[0].bg_color, DEFAULT_BANNER_BG);
        assert!(stored[0].updated_at >= created.updated_at);

        delete_banner(&tables, &created.id).await.expect("delete");
        assert!(list_banners(&tables).await.expect("list").is_empty());
    }
}
