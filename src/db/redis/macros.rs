/// A macro to simplify read-through caching against Redis.
///
/// Checks the cache for the key first and returns the hit if present.
/// On a miss it executes the provided block, stores the computed value
/// in the background, and returns it.
///
/// # Arguments
/// * `$cache`: The cache instance. Must provide `get_from_cache` and
///   `set_in_background`.
/// * `$key`: The key to cache the value under.
/// * `$ttl`: The time-to-live for the cached value in seconds.
/// * `$block`: The block of code to execute when the value is not cached.
///
/// # Example
/// ```ignore
/// let movies = cached!(cache, CacheKey::PopularMovies(page), 3600, async move {
///     fetch_popular_from_tmdb(page)
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let __out: $crate::error::AppResult<_> = if let Some(cached) =
            $cache.get_from_cache(&$key).await?
        {
            Ok(cached)
        } else {
            let __cached: $crate::error::AppResult<_> = $block.await;
            let value = __cached?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        };
        __out
    }};
}
