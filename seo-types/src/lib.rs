use typesafe_repository::Selector;

pub mod seo_url;
pub mod seo_url_template;

pub struct By<T>(pub T);

impl<T> Selector for By<T> {}

/// Returns `path` with exactly one leading slash.
pub fn with_leading_slash<S: AsRef<str>>(path: S) -> String {
    format!("/{}", without_leading_slash(path.as_ref()))
}

pub fn without_leading_slash(path: &str) -> &str {
    path.trim_start_matches('/')
}
