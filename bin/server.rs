// Catalog Mail-Merge - Web Server
// Upload form + merge endpoint returning mail_merge.csv

use axum::{
    extract::{multipart::Multipart, DefaultBodyLimit},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use mail_merge::{
    run_pipeline, EmailTemplate, MatchPredicate, MergeError, PipelineConfig, ProductFormat,
    OUTPUT_FILENAME, OUTPUT_MIME,
};

/// One uploaded file plus its original filename.
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Form fields collected from the multipart request.
#[derive(Default)]
struct MergeForm {
    products: Option<Upload>,
    customers: Option<Upload>,
    sku_column: Option<String>,
    max_matches: Option<usize>,
    emails: bool,
    sender_name: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - Serve the upload form
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /merge - Run the pipeline on the uploaded files
async fn merge(multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(message) => return error_page(StatusCode::BAD_REQUEST, &message),
    };

    let Some(products) = form.products else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "Please upload a product catalog (PDF or CSV).",
        );
    };
    let Some(customers) = form.customers else {
        return error_page(StatusCode::BAD_REQUEST, "Please upload a customers CSV.");
    };

    let format = match ProductFormat::from_filename(&products.filename) {
        Ok(format) => format,
        Err(e) => return merge_error_page(&e),
    };

    let mut config = PipelineConfig::new(format);
    if let Some(column) = form.sku_column {
        config.match_config.predicate = MatchPredicate::SkuList { column };
    }
    config.match_config.max_matches_per_customer = form.max_matches;
    if form.emails {
        let mut template = EmailTemplate::default();
        if let Some(sender) = form.sender_name {
            template.sender_name = sender;
        }
        config.template = Some(template);
    }

    // Small uploads, synchronous single pass: run inline.
    match run_pipeline(&products.bytes, &customers.bytes, &config) {
        Ok(output) => {
            let disposition = format!("attachment; filename=\"{}\"", OUTPUT_FILENAME);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, OUTPUT_MIME.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                output.csv,
            )
                .into_response()
        }
        Err(e) => merge_error_page(&e),
    }
}

/// Collect known fields from the multipart stream; unknown fields are
/// ignored so the form can evolve.
async fn read_form(mut multipart: Multipart) -> Result<MergeForm, String> {
    let mut form = MergeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Could not read upload: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();
        let filename = field.file_name().unwrap_or("").to_string();

        match name.as_str() {
            "products" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Could not read product file: {}", e))?;
                if !bytes.is_empty() {
                    form.products = Some(Upload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "customers" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Could not read customer file: {}", e))?;
                if !bytes.is_empty() {
                    form.customers = Some(Upload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "sku_column" => {
                let value = field.text().await.unwrap_or_default();
                if !value.trim().is_empty() {
                    form.sku_column = Some(value.trim().to_string());
                }
            }
            "max_matches" => {
                let value = field.text().await.unwrap_or_default();
                form.max_matches = value.trim().parse().ok();
            }
            "emails" => {
                form.emails = true;
                let _ = field.text().await;
            }
            "sender_name" => {
                let value = field.text().await.unwrap_or_default();
                if !value.trim().is_empty() {
                    form.sender_name = Some(value.trim().to_string());
                }
            }
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    Ok(form)
}

/// Map pipeline errors to user-facing pages. Fatal kinds get a 422;
/// the body names the kind so the form can show a precise message.
fn merge_error_page(error: &MergeError) -> Response {
    error_page(
        StatusCode::UNPROCESSABLE_ENTITY,
        &format!("[{}] {}", error.kind(), error),
    )
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let html = format!(
        "<html><body><h1>Merge failed</h1><p>{}</p><p><a href=\"/\">Back</a></p></body></html>",
        message
    );
    (status, Html(html)).into_response()
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Catalog Mail-Merge - Web Server v{}", mail_merge::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let app = Router::new()
        .route("/", get(serve_index))
        .route("/merge", post(merge))
        .route("/api/health", get(health_check))
        // Keep uploads under 25 MB
        .layer(DefaultBodyLimit::max(25 * 1024 * 1024))
        .layer(CorsLayer::permissive());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   Upload: http://{}/", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
