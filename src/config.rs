use anyhow::Context;
use log_error::LogError;
use once_cell::sync::Lazy;

pub const DEFAULT_DB_PATH: &str = "storage/seo_url.db";
pub const DEFAULT_INSERT_CHUNK: usize = 250;

pub static DB_PATH: Lazy<String> = Lazy::new(|| {
    envmnt::get_parse("SEO_URL_DB")
        .context("SEO_URL_DB not set")
        .log_error("Using default seo url storage")
        .unwrap_or(DEFAULT_DB_PATH.to_string())
});

/// Nine parameters per inserted row must stay below sqlite's host parameter limit.
pub const MAX_INSERT_CHUNK: usize = 3000;

/// Rows per multi-row insert statement.
pub static INSERT_CHUNK: Lazy<usize> =
    Lazy::new(|| insert_chunk(envmnt::get_parse("SEO_URL_INSERT_CHUNK").ok()));

pub(crate) fn insert_chunk(value: Option<usize>) -> usize {
    match value {
        Some(v) if (1..=MAX_INSERT_CHUNK).contains(&v) => v,
        Some(v) => {
            log::warn!(
                "SEO_URL_INSERT_CHUNK={v} is outside 1..={MAX_INSERT_CHUNK}, using {DEFAULT_INSERT_CHUNK}"
            );
            DEFAULT_INSERT_CHUNK
        }
        None => DEFAULT_INSERT_CHUNK,
    }
}

pub fn load_env_file() -> Result<(), anyhow::Error> {
    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(".env")?;
            envmnt::load_file(".env")?;
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_chunk_stays_within_parameter_limit() {
        assert_eq!(insert_chunk(None), DEFAULT_INSERT_CHUNK);
        assert_eq!(insert_chunk(Some(500)), 500);
        assert_eq!(insert_chunk(Some(MAX_INSERT_CHUNK)), MAX_INSERT_CHUNK);
        assert_eq!(insert_chunk(Some(0)), DEFAULT_INSERT_CHUNK);
        assert_eq!(insert_chunk(Some(100_000)), DEFAULT_INSERT_CHUNK);
    }
}
