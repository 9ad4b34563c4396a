use target_core::db::RepositoryRegistry;
use target_core::{FinancialYear, RepositoryError, TargetRepository};
use target_db_sqlite::SqliteRepositoryFactory;
use tracing::debug;

use crate::editor::{EditorContext, EditorError, GridEditor};

/// Every backend this binary can open.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Read the staff and service directories for an editing session.
pub async fn load_context<R>(
    repo: &R,
    financial_year: FinancialYear,
) -> Result<EditorContext, RepositoryError>
where
    R: TargetRepository + ?Sized,
{
    let staff = repo.list_staff().await?;
    let services = repo.list_services().await?;
    debug!(staff = staff.len(), services = services.len(), "loaded directories");

    Ok(EditorContext {
        financial_year,
        staff,
        services,
    })
}

/// An editor for `financial_year` with its grid already loaded.
pub async fn open_editor<R>(
    repo: &R,
    financial_year: FinancialYear,
) -> Result<GridEditor, EditorError>
where
    R: TargetRepository + ?Sized,
{
    let context = load_context(repo, financial_year).await?;
    let mut editor = GridEditor::new(context);
    editor.load(repo).await?;
    Ok(editor)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use target_core::db::DbConfig;

    use super::*;

    fn memory_config() -> DbConfig {
        DbConfig {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }

    #[test]
    fn registry_offers_sqlite() {
        assert_eq!(build_registry().available_backends(), vec!["sqlite"]);
    }

    #[tokio::test]
    async fn context_lists_seeded_directories() {
        let repo = build_registry().create(&memory_config()).await.unwrap();

        let context = load_context(&*repo, FinancialYear::starting(2024))
            .await
            .unwrap();

        let names: Vec<_> = context.staff.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Amara Okafor", "Ben Hartley", "Chloe Evans"]);
        assert_eq!(context.services.len(), 3);
    }

    #[tokio::test]
    async fn open_editor_starts_clean_and_zero_filled() {
        let repo = build_registry().create(&memory_config()).await.unwrap();

        let editor = open_editor(&*repo, FinancialYear::starting(2024))
            .await
            .unwrap();

        assert!(!editor.has_unsaved_changes());
        assert_eq!(editor.grid().grand_total(), 0);
        assert_eq!(editor.grid().value(1, 4, "Assessments"), Some(0));
    }
}
