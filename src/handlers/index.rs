//! `GET /` usage page

use axum::response::Html;

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>DuckDuckGo API</title>
  <style>
    body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
    h1 { color: #333; }
    pre { background: #f4f4f4; padding: 10px; border-radius: 5px; }
  </style>
</head>
<body>
  <h1>DuckDuckGo API</h1>
  <p>Web search and page content extraction over HTTP.</p>

  <h2>Endpoints</h2>
  <h3>1. Search</h3>
  <pre>GET /search?query=your+search+terms&amp;max_results=10</pre>

  <h3>2. Fetch content</h3>
  <pre>GET /fetch?url=https://example.com</pre>
</body>
</html>
"#;

/// Serve the usage page
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_PAGE)
}
