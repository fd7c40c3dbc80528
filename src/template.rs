//! Shared HTML page template for the route index and error pages.

/// Title used when a page does not supply its own.
pub const DEFAULT_TITLE: &str = "Rust HttpBin";

/// Wraps an HTML fragment in the page shell.
///
/// # Examples
///
/// ```
/// use routebin::template::render_page;
///
/// let page = render_page("Not Found", "<h1>404 - Not Found</h1>");
/// assert!(page.contains("<title>Not Found</title>"));
/// assert!(page.contains("<h1>404 - Not Found</h1>"));
/// ```
pub fn render_page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         </head>\n\
         <body>\n\
         {body}\n\
         </body>\n\
         </html>\n"
    )
}
