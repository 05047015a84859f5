use crate::dashboard::{CoreOptions, DashboardCore};
use crate::init_tracing;
use crate::models::{
    AnalyzePayload, AppSettings, BackendStatus, BooleanResponse, DashboardData, ListReportsFilters,
    SaveBackendConfigPayload, SaveReportPayload, SavedReport, SessionSnapshot,
};
use std::sync::Arc;
use tauri::Manager;

#[derive(Clone)]
struct AppState {
    core: Arc<DashboardCore>,
}

#[tauri::command]
async fn get_session(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(state.core.session().await)
}

#[tauri::command]
async fn analyze_data(state: tauri::State<'_, AppState>, payload: AnalyzePayload) -> Result<SessionSnapshot, String> {
    state.core.analyze(&payload.raw_text).await.map_err(to_client_error)
}

#[tauri::command]
async fn run_demo(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    state.core.run_demo().await.map_err(to_client_error)
}

#[tauri::command]
async fn retry_analysis(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    state.core.retry().await.map_err(to_client_error)
}

#[tauri::command]
async fn reset_analysis(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    state.core.reset().await.map_err(to_client_error)
}

#[tauri::command]
fn get_sample_input(state: tauri::State<'_, AppState>) -> String {
    state.core.sample_input().to_string()
}

#[tauri::command]
async fn show_analysis(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(state.core.show_analysis().await)
}

#[tauri::command]
async fn open_admin(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(state.core.open_admin().await)
}

#[tauri::command]
async fn login(state: tauri::State<'_, AppState>, password: String) -> Result<SessionSnapshot, String> {
    Ok(state.core.login(&password).await)
}

#[tauri::command]
async fn cancel_login(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(state.core.cancel_login().await)
}

#[tauri::command]
async fn logout(state: tauri::State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(state.core.logout().await)
}

#[tauri::command]
async fn load_report(state: tauri::State<'_, AppState>, data: DashboardData) -> Result<SessionSnapshot, String> {
    state.core.load_report(data).await.map_err(to_client_error)
}

#[tauri::command]
async fn list_reports(
    state: tauri::State<'_, AppState>,
    filters: Option<ListReportsFilters>,
) -> Result<Vec<SavedReport>, String> {
    state
        .core
        .list_reports(filters.unwrap_or_default())
        .await
        .map_err(to_client_error)
}

#[tauri::command]
async fn save_report(state: tauri::State<'_, AppState>, payload: SaveReportPayload) -> Result<SavedReport, String> {
    state.core.save_report(payload).await.map_err(to_client_error)
}

#[tauri::command]
async fn delete_report(state: tauri::State<'_, AppState>, report_id: String) -> Result<BooleanResponse, String> {
    state.core.delete_report(&report_id).await.map_err(to_client_error)
}

#[tauri::command]
fn get_backend_status(state: tauri::State<'_, AppState>) -> Result<BackendStatus, String> {
    state.core.backend_status().map_err(to_client_error)
}

#[tauri::command]
async fn save_backend_config(
    state: tauri::State<'_, AppState>,
    payload: SaveBackendConfigPayload,
) -> Result<BackendStatus, String> {
    state.core.save_backend_config(payload).await.map_err(to_client_error)
}

#[tauri::command]
async fn clear_backend_config(state: tauri::State<'_, AppState>) -> Result<BackendStatus, String> {
    state.core.clear_backend_config().await.map_err(to_client_error)
}

#[tauri::command]
fn get_settings(state: tauri::State<'_, AppState>) -> Result<AppSettings, String> {
    state.core.get_settings().map_err(to_client_error)
}

#[tauri::command]
fn update_settings(state: tauri::State<'_, AppState>, settings: serde_json::Value) -> Result<AppSettings, String> {
    state.core.update_settings(settings).map_err(to_client_error)
}

#[tauri::command]
async fn save_provider_token(state: tauri::State<'_, AppState>, token: String) -> Result<BooleanResponse, String> {
    state.core.save_provider_token(token).await.map_err(to_client_error)
}

#[tauri::command]
async fn clear_provider_token(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    state.core.clear_provider_token().await.map_err(to_client_error)
}

#[tauri::command]
async fn has_provider_token(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    state.core.has_provider_token().await.map_err(to_client_error)
}

pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            init_tracing(&app_data_dir).map_err(|error| error.to_string())?;

            let options = CoreOptions::from_process_env().map_err(|error| error.to_string())?;
            let core = DashboardCore::new(app_data_dir, options).map_err(|error| error.to_string())?;

            app.manage(AppState { core });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_session,
            analyze_data,
            run_demo,
            retry_analysis,
            reset_analysis,
            get_sample_input,
            show_analysis,
            open_admin,
            login,
            cancel_login,
            logout,
            load_report,
            list_reports,
            save_report,
            delete_report,
            get_backend_status,
            save_backend_config,
            clear_backend_config,
            get_settings,
            update_settings,
            save_provider_token,
            clear_provider_token,
            has_provider_token
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}

/// Frontend receives the `CODE: detail` form and maps codes to messages.
fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
