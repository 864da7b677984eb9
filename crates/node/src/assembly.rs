// Path: crates/node/src/assembly.rs

//! Leaf-first construction of the retrieval system.
//!
//! Build order: KV backend, then stores, then the chain client and chunk
//! sources, then tx-offset sources, then the data-source chain, then
//! workers. Back-references (cache → attribute importer, verification →
//! chunk source) travel through `weave-api` traits, so no construction
//! cycle exists.

use crate::index::KvDataIndex;
use std::sync::Arc;
use weave_api::{
    AttributeImportSink, ChunkSource, ContiguousDataSource, KvBuffer, NameResolver, ObjectStore,
    TxOffsetSource,
};
use weave_chain::tx_offset::TX_OFFSET_PREFIX;
use weave_chain::{
    CachedRootTxResolver, CachingChainClient, CachingNameResolver, ChainTxOffsetSource,
    CompositeTxOffsetSource, DatabaseTxOffsetSource, FsBlockStore, HttpChainClient,
    OffsetBlockMapping,
};
use weave_chunks::{
    ChainChunkSource, ComposedChunkSource, FsChunkDataStore, KvChunkMetadataStore,
    ObjectStoreChunkSource, ReadThroughChunkSource, SequentialChunkSource,
};
use weave_kv::{FsKvStore, KvJsonStore, LruKvStore, RedbKvStore, RedisKvStore};
use weave_sources::{
    ChaosDataSource, FilteredDataSource, GatewayDataSource, ReadThroughDataCache,
    FsContiguousDataStore, SamplingDataSource, SequentialDataSource, TxChunksDataSource,
};
use weave_types::config::{GatewayConfig, KvBackendConfig};
use weave_types::offset::TxDataOffset;
use weave_workers::{
    DataAttributesImporter, DataVerificationWorker, FailureSimulator, TxOffsetImporter,
};

/// Externally-provided collaborator roles. Every field is optional; the
/// system degrades gracefully without them.
#[derive(Default)]
pub struct Collaborators {
    /// Upstream name resolver; enables the caching name surface.
    pub name_resolver: Option<Arc<dyn NameResolver>>,
    /// S3-shaped chunk mirror, tried before the chain for chunk bytes.
    pub object_store: Option<Arc<dyn ObjectStore>>,
    /// Optional object-store key prefix for chunk objects.
    pub object_store_prefix: Option<String>,
}

/// The assembled retrieval system.
pub struct System {
    /// The root of the retrieval chain.
    pub data_source: Arc<dyn ContiguousDataSource>,
    /// The caching name resolver, when a collaborator was provided.
    pub name_resolver: Option<Arc<CachingNameResolver>>,
    /// The shared index.
    pub index: Arc<KvDataIndex>,
    /// The partial block header store.
    pub block_store: Arc<FsBlockStore>,
    /// The offset importer, exposed for ingest flows.
    pub tx_offset_importer: Arc<TxOffsetImporter>,
    /// The verification worker, exposed for ingest flows.
    pub verification_worker: Arc<DataVerificationWorker>,
    attribute_importer: Arc<DataAttributesImporter>,
    kv: Arc<dyn KvBuffer>,
}

impl System {
    /// Builds the system from config and injected collaborators.
    pub async fn build(
        config: &GatewayConfig,
        collaborators: Collaborators,
    ) -> anyhow::Result<System> {
        // --- Leaves: the shared KV backend ---
        let kv: Arc<dyn KvBuffer> = match &config.kv {
            KvBackendConfig::Fs { path } => {
                Arc::new(FsKvStore::open(config.data_dir.join(path))?)
            }
            KvBackendConfig::Redb { path } => {
                Arc::new(RedbKvStore::open(config.data_dir.join(path))?)
            }
            KvBackendConfig::Lru {
                max_keys,
                ttl_seconds,
            } => Arc::new(LruKvStore::new(*max_keys, *ttl_seconds)?),
            KvBackendConfig::Redis { url, ttl_seconds } => {
                Arc::new(RedisKvStore::connect(url, *ttl_seconds).await?)
            }
        };

        // --- Stores ---
        let index = Arc::new(KvDataIndex::new(Arc::clone(&kv)));
        let chunk_data_store = Arc::new(FsChunkDataStore::open(&config.data_dir)?);
        let chunk_metadata_store = Arc::new(KvChunkMetadataStore::new(Arc::clone(&kv)));
        let contiguous_store = Arc::new(FsContiguousDataStore::open(&config.data_dir)?);
        let block_store = Arc::new(FsBlockStore::open(&config.data_dir)?);
        let offset_store = Arc::new(KvJsonStore::<TxDataOffset>::new(
            Arc::clone(&kv),
            TX_OFFSET_PREFIX,
            true,
        ));

        // --- Chain client and chunk sources ---
        let mapping = config
            .offset_mapping_path
            .as_deref()
            .and_then(OffsetBlockMapping::load);
        let chain = Arc::new(CachingChainClient::new(
            Arc::new(HttpChainClient::new(&config.chain, mapping.clone())?),
            Arc::clone(&block_store),
            mapping,
        ));

        let mut chunk_upstreams: Vec<Arc<dyn ChunkSource>> = Vec::new();
        if let Some(object_store) = &collaborators.object_store {
            chunk_upstreams.push(Arc::new(ComposedChunkSource::new(
                Arc::new(ObjectStoreChunkSource::new(
                    Arc::clone(object_store),
                    collaborators.object_store_prefix.clone(),
                )),
                Arc::clone(&chunk_metadata_store) as _,
            )));
        }
        chunk_upstreams.push(Arc::new(ChainChunkSource::new(Arc::clone(&chain) as _)));
        let chunk_source: Arc<dyn ChunkSource> = Arc::new(ReadThroughChunkSource::new(
            Arc::clone(&chunk_data_store) as _,
            Arc::clone(&chunk_metadata_store) as _,
            Arc::new(SequentialChunkSource::new(chunk_upstreams)),
        ));

        // --- Tx offset sources ---
        let tx_offsets: Arc<dyn TxOffsetSource> = Arc::new(CompositeTxOffsetSource::new(
            Arc::new(DatabaseTxOffsetSource::new(Arc::clone(&offset_store))),
            Some(Arc::new(ChainTxOffsetSource::new(Arc::clone(&chain) as _))),
            true,
        ));

        // --- Sources ---
        let root_tx = Arc::new(CachedRootTxResolver::new(
            Arc::clone(&index) as _,
            Arc::clone(&kv),
        ));
        let tx_chunks: Arc<dyn ContiguousDataSource> = Arc::new(
            TxChunksDataSource::new(Arc::clone(&tx_offsets), Arc::clone(&chunk_source))
                .with_root_tx_resolver(root_tx),
        );

        let mut links: Vec<Arc<dyn ContiguousDataSource>> = Vec::new();
        if let Some(gateway) = &config.trusted_gateway {
            links.push(Self::maybe_chaos(
                Arc::new(GatewayDataSource::new(gateway).map_err(|e| anyhow::anyhow!("{e}"))?),
                config,
            ));
        }
        links.push(Self::maybe_chaos(tx_chunks, config));
        let chain_of_sources: Arc<dyn ContiguousDataSource> =
            Arc::new(SequentialDataSource::new(links));

        // --- Workers feeding the read-through caches ---
        let attribute_importer = Arc::new(DataAttributesImporter::start(
            Arc::clone(&index) as _,
            config.workers.attributes,
        ));
        let tx_offset_importer = Arc::new(TxOffsetImporter::start(
            Arc::clone(&tx_offsets),
            offset_store,
            config.workers.tx_offsets,
        ));

        let mut source: Arc<dyn ContiguousDataSource> = Arc::new(ReadThroughDataCache::new(
            chain_of_sources,
            contiguous_store,
            Arc::clone(&index) as _,
            Arc::clone(&attribute_importer) as Arc<dyn AttributeImportSink>,
        ));

        // Verification re-derives roots over the chunk path only, never
        // through peer caches.
        let verification_source: Arc<dyn ContiguousDataSource> = Arc::new(
            TxChunksDataSource::new(Arc::clone(&tx_offsets), chunk_source),
        );
        let verification_worker = Arc::new(DataVerificationWorker::start(
            verification_source,
            Arc::clone(&index) as _,
            config.workers.verification,
        ));

        // --- Policy decorators, outermost last ---
        if let Some(sampling) = config.sampling {
            source = Arc::new(SamplingDataSource::new(source, sampling));
        }
        source = Arc::new(FilteredDataSource::new(source, &config.filter));

        let name_resolver = collaborators.name_resolver.map(|upstream| {
            Arc::new(CachingNameResolver::new(
                upstream,
                CachingNameResolver::cache_on(Arc::clone(&kv)),
            ))
        });

        Ok(System {
            data_source: source,
            name_resolver,
            index,
            block_store,
            tx_offset_importer,
            verification_worker,
            attribute_importer,
            kv,
        })
    }

    fn maybe_chaos(
        source: Arc<dyn ContiguousDataSource>,
        config: &GatewayConfig,
    ) -> Arc<dyn ContiguousDataSource> {
        match config.chaos {
            Some(chaos) => Arc::new(ChaosDataSource::new(
                source,
                FailureSimulator::new(chaos.failure_rate),
            )),
            None => source,
        }
    }

    /// Stops workers and flushes stores, in reverse construction order.
    pub async fn shutdown(&self) {
        self.verification_worker.stop().await;
        self.tx_offset_importer.stop().await;
        self.attribute_importer.stop().await;
        if let Err(e) = self.kv.close().await {
            tracing::warn!(target: "node", error = %e, "kv close failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_api::GetDataParams;
    use weave_types::error::DataSourceError;
    use weave_types::id::TxId;

    fn test_config(dir: &std::path::Path) -> GatewayConfig {
        GatewayConfig {
            data_dir: dir.to_path_buf(),
            kv: KvBackendConfig::Lru {
                max_keys: 1024,
                ttl_seconds: 3600,
            },
            ..GatewayConfig::default()
        }
    }

    #[tokio::test]
    async fn builds_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let system = System::build(&test_config(dir.path()), Collaborators::default())
            .await
            .unwrap();
        assert!(system.name_resolver.is_none());
        system.shutdown().await;
    }

    #[tokio::test]
    async fn filter_policy_applies_to_the_assembled_chain() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.filter.blocked_ip_addresses = vec!["10.0.0.0/8".to_string()];

        let system = System::build(&config, Collaborators::default())
            .await
            .unwrap();
        let mut params = GetDataParams::new(TxId([1u8; 32]));
        params.attributes = Some(weave_types::data::RequestAttributes {
            origin: None,
            client_ip: Some("10.1.2.3".to_string()),
            hops: None,
        });
        assert!(matches!(
            system.data_source.get_data(params).await,
            Err(DataSourceError::Filtered(_))
        ));
        system.shutdown().await;
    }
}
