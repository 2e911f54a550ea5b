/// Read-through caching for provider calls.
///
/// Takes an `Option<&Cache>`. With a cache, a hit returns the cached value and a
/// miss evaluates the block and queues the result for a background write. A
/// failed cache read is logged and treated as a miss. Without a cache the block
/// is evaluated directly.
///
/// # Arguments
/// * `$cache`: `Option<&Cache>`.
/// * `$key`: The `CacheKey` for the value.
/// * `$ttl`: Time-to-live for the cached value in seconds.
/// * `$block`: Future computing the value on a miss.
///
/// # Example
/// ```rust,ignore
/// let popular: Vec<MediaItem> = cached!(self.cache.as_ref(), CacheKey::Popular(1), 3600, async move {
///     fetch_popular().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache {
            Some(cache) => {
                let key = $key;
                match cache.read(&key).await {
                    Ok(Some(cached)) => Ok(cached),
                    Ok(None) => {
                        let value = $block.await?;
                        cache.write_behind(&key, &value, $ttl);
                        Ok(value)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, key = %key, "Cache read failed, bypassing cache");
                        $block.await
                    }
                }
            }
            None => $block.await,
        }
    }};
}
