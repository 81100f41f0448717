/// Read-through caching over a [`Cache`](crate::db::Cache).
///
/// Reads the key's generation first, then returns the value cached under
/// that generation when present. Otherwise awaits the loader and stores its
/// result under the generation read before loading, so an invalidation that
/// lands mid-load leaves the fresh generation empty. Loader errors propagate
/// through `?`; cache failures only ever turn into misses, and an unreadable
/// generation skips the cache entirely.
///
/// # Arguments
/// * `$cache`: The cache to read from and populate.
/// * `$key`: The [`CacheKey`](crate::db::CacheKey) to use.
/// * `$block`: Future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let entries: Vec<CatalogEntry> = cached!(self.cache, CacheKey::MediaList, async {
///     load_listing().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        match $cache.generation(&$key).await {
            None => $block.await,
            Some(generation) => {
                if let Some(cached) = $cache.get_from_cache(&$key, generation).await {
                    tracing::debug!(key = %$key, generation, "Cache hit");
                    Ok(cached)
                } else {
                    tracing::debug!(key = %$key, generation, "Cache miss");
                    match $block.await {
                        Ok(value) => {
                            $cache.set_in_cache(&$key, generation, &value).await;
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            }
        }
    }};
}
