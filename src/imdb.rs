use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{debug, info, warn};
use ndarray::Array2;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::spawn_blocking;
use utoipa::ToSchema;

use crate::config::{ConfDir, PipelineConfig, SearchOptions, VerifyOptions};
use crate::db::{Database, FeaturesRecord, SignatureRecord, crud, init_db};
use crate::error::{Error, Result};
use crate::extractor::Extractor;
use crate::features::Features;
use crate::index::{ImageId, IndexKind, SignatureIndex};
use crate::metrics;
use crate::reduce::{Pca, Reducer};
use crate::utils::{hash_bytes, pb_style, scan_images};
use crate::verify::{Candidate, Verifier};
use crate::vlad::{aggregate, l2_normalize};
use crate::vocab::{CentroidVocabulary, Clusterer, Vocabulary};

/// 训练描述符 PCA 时最多使用的描述符数量
const MAX_PCA_SAMPLES: usize = 100_000;

/// 构建进度，由磁盘上的持久化状态推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum BuildStage {
    Empty,
    VocabularyReady,
    SignaturesReady,
    Indexed,
}

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SearchResult {
    /// 图片 ID
    pub id: ImageId,
    /// 图片路径
    pub path: String,
    /// 几何校验的内点数量
    pub score: usize,
    /// VLAD 向量之间的欧氏距离
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added(ImageId),
    /// 相同内容的图片已存在，只更新了路径
    Updated(ImageId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddReport {
    pub added: usize,
    pub updated: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureReport {
    pub computed: usize,
    /// 没有描述符或 VLAD 向量为 0 而被跳过的图片
    pub skipped: usize,
}

/// 查询所需的全部模型，整体替换
pub struct Searcher {
    pub vocabulary: CentroidVocabulary,
    pub descriptor_pca: Option<Pca>,
    pub signature_pca: Option<Pca>,
    pub index: SignatureIndex,
}

impl Searcher {
    fn load(conf_dir: &ConfDir) -> Result<Self> {
        let index_path = conf_dir.index();
        if !index_path.exists() {
            return Err(Error::EmptyIndex);
        }
        let index = SignatureIndex::open(&index_path)?;
        let (vocabulary, descriptor_pca, signature_pca) = load_models(conf_dir)?;
        Ok(Self { vocabulary, descriptor_pca, signature_pca, index })
    }

    /// 计算查询图片的 VLAD 向量，没有有效向量时返回 None
    pub fn signature(&self, features: &Features) -> Result<Option<Vec<f32>>> {
        let v = match &self.descriptor_pca {
            Some(pca) => aggregate(&features.transform(pca)?, &self.vocabulary),
            None => aggregate(features, &self.vocabulary),
        };
        let v = match v {
            Ok(v) => v,
            Err(Error::EmptySignature) => return Ok(None),
            Err(e) => return Err(e),
        };
        match &self.signature_pca {
            Some(pca) => reduce_signature(pca, &v),
            None => Ok(Some(v)),
        }
    }
}

/// 降维后重新做 L2 归一化
fn reduce_signature(pca: &Pca, v: &[f32]) -> Result<Option<Vec<f32>>> {
    let mut y = pca.transform(v)?;
    match l2_normalize(&mut y) {
        Ok(()) => Ok(Some(y)),
        Err(Error::EmptySignature) => Ok(None),
        Err(e) => Err(e),
    }
}

fn load_models(conf_dir: &ConfDir) -> Result<(CentroidVocabulary, Option<Pca>, Option<Pca>)> {
    if !conf_dir.vocabulary().exists() {
        return Err(Error::MissingVocabulary);
    }
    let vocabulary = CentroidVocabulary::open(conf_dir.vocabulary())?;
    let open_pca = |path: PathBuf| path.exists().then(|| Pca::open(path)).transpose();
    let descriptor_pca = open_pca(conf_dir.descriptor_pca())?;
    let signature_pca = open_pca(conf_dir.signature_pca())?;
    Ok((vocabulary, descriptor_pca, signature_pca))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("删除 {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub struct IMDBBuilder {
    conf_dir: ConfDir,
    config: PipelineConfig,
}

impl IMDBBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        let config = PipelineConfig::new(conf_dir.path());
        Self { conf_dir, config }
    }

    /// 使用完整的配置，工作目录以配置为准
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.conf_dir = ConfDir::new(&config.work_dir);
        self.config = config;
        self
    }

    pub fn corpus_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.corpus_path = Some(path.into());
        self
    }

    pub fn descriptor_count(mut self, count: u32) -> Self {
        self.config.descriptor_count = count;
        self
    }

    /// 训练词典前将描述符降到指定维度
    pub fn descriptor_reduction(mut self, components: Option<usize>) -> Self {
        self.config.use_descriptor_reduction = components.is_some();
        if let Some(n) = components {
            self.config.descriptor_components = n;
        }
        self
    }

    /// 建立索引前将 VLAD 向量降到指定维度
    pub fn signature_reduction(mut self, components: Option<usize>) -> Self {
        self.config.use_signature_reduction = components.is_some();
        if let Some(n) = components {
            self.config.signature_components = n;
        }
        self
    }

    pub async fn open(self) -> Result<IMDB> {
        std::fs::create_dir_all(self.conf_dir.path())?;
        let db = init_db(self.conf_dir.database()).await?;
        let imdb = IMDB {
            conf_dir: self.conf_dir,
            config: self.config,
            db,
            searcher: RwLock::new(None),
        };
        if imdb.conf_dir.index().exists() {
            imdb.reload().await?;
        }
        Ok(imdb)
    }
}

pub struct IMDB {
    conf_dir: ConfDir,
    config: PipelineConfig,
    db: Database,
    searcher: RwLock<Option<Arc<Searcher>>>,
}

impl IMDB {
    pub fn conf_dir(&self) -> &ConfDir {
        &self.conf_dir
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 根据磁盘上的文件推导当前构建进度
    pub async fn stage(&self) -> Result<BuildStage> {
        if self.conf_dir.index().exists() {
            return Ok(BuildStage::Indexed);
        }
        if crud::count_signatures(&self.db).await? > 0 {
            return Ok(BuildStage::SignaturesReady);
        }
        if self.conf_dir.vocabulary().exists() {
            return Ok(BuildStage::VocabularyReady);
        }
        Ok(BuildStage::Empty)
    }

    pub async fn count_images(&self) -> Result<usize> {
        Ok(crud::count_images(&self.db).await? as usize)
    }

    pub async fn image_path(&self, id: ImageId) -> Result<Option<String>> {
        Ok(crud::get_image_path(&self.db, id).await?)
    }

    /// 从数据库中删除给定路径的图片及其特征点，返回删除的数量
    ///
    /// 已构建的索引不会更新，需要重新执行 build
    pub async fn remove_images(&self, paths: &[PathBuf]) -> Result<usize> {
        let paths = paths.iter().map(|p| p.to_string_lossy()).collect::<HashSet<_>>();
        let mut removed = 0;
        for image in crud::get_images(&self.db).await? {
            if !paths.contains(image.path.as_str()) {
                continue;
            }
            if crud::delete_image(&self.db, image.id).await? {
                debug!("从数据库删除图片 {}: {}", image.id, image.path);
                removed += 1;
            }
        }
        if removed > 0 {
            warn!("删除了 {removed} 张已入库的图片，请重新构建索引");
        }
        Ok(removed)
    }

    /// 添加一张图片的特征点，内容哈希已存在时只更新路径
    pub async fn add_features(
        &self,
        path: &str,
        hash: &[u8],
        features: Features,
    ) -> Result<AddOutcome> {
        if let Some(id) = crud::find_image_by_hash(&self.db, hash).await? {
            crud::update_image_path(&self.db, id, path).await?;
            return Ok(AddOutcome::Updated(id));
        }
        let features = features.retain_strongest(self.config.descriptor_count as usize);

        let mut tx = self.db.begin().await?;
        let id = crud::add_image(&mut *tx, hash, path).await?;
        let record = FeaturesRecord::encode(id, &features)?;
        crud::add_features(&mut *tx, &record).await?;
        tx.commit().await?;
        Ok(AddOutcome::Added(id))
    }

    /// 提取一张图片的特征点并添加到数据库
    pub async fn add_image(
        &self,
        path: &str,
        bytes: Vec<u8>,
        extractor: Arc<dyn Extractor>,
    ) -> Result<AddOutcome> {
        let hash = hash_bytes(&bytes);
        if let Some(id) = crud::find_image_by_hash(&self.db, &hash).await? {
            crud::update_image_path(&self.db, id, path).await?;
            return Ok(AddOutcome::Updated(id));
        }
        let features = spawn_blocking(move || extractor.extract(&bytes)).await??;
        self.add_features(path, &hash, features).await
    }

    /// 扫描图片目录并添加所有图片，单张图片失败不影响其他图片
    pub async fn add_corpus(
        &self,
        extractor: Arc<dyn Extractor>,
        suffix: &Regex,
    ) -> Result<AddReport> {
        let Some(corpus) = self.config.corpus_path.clone() else {
            return Err(Error::Unsupported("未指定图片目录".to_string()));
        };
        let suffix = suffix.clone();
        let entries = spawn_blocking(move || scan_images(&corpus, &suffix)).await?;

        let mut report = AddReport::default();
        let pb = ProgressBar::new(entries.len() as u64).with_style(pb_style());

        // 先计算哈希，跳过已添加的图片
        let hashed = spawn_blocking({
            let pb = pb.clone();
            move || {
                pb.set_message("计算哈希");
                entries
                    .into_par_iter()
                    .map(|path| {
                        let hash = std::fs::read(&path).map(|bytes| hash_bytes(&bytes));
                        (path, hash)
                    })
                    .collect::<Vec<_>>()
            }
        })
        .await?;

        let mut pending = vec![];
        for (path, hash) in hashed {
            let name = path.to_string_lossy().to_string();
            match hash {
                Ok(hash) => match crud::find_image_by_hash(&self.db, &hash).await? {
                    Some(id) => {
                        crud::update_image_path(&self.db, id, &name).await?;
                        pb.set_message(format!("更新图片路径: {name}"));
                        pb.inc(1);
                        report.updated += 1;
                    }
                    None => pending.push(path),
                },
                Err(e) => {
                    pb.println(format!("读取图片失败: {name}: {e}"));
                    pb.inc(1);
                    report.failed += 1;
                }
            }
        }

        // 并行提取特征点，逐个写入数据库
        let (tx, mut rx) = tokio::sync::mpsc::channel(num_cpus::get() * 2);
        let task = spawn_blocking({
            let pb = pb.clone();
            move || {
                pending.into_par_iter().for_each(|path| {
                    let result = std::fs::read(&path)
                        .map_err(Error::from)
                        .and_then(|bytes| Ok((hash_bytes(&bytes), extractor.extract(&bytes)?)));
                    match &result {
                        Err(e) if e.is_per_image() => {
                            pb.println(format!("计算特征点失败: {}: {e}", path.display()))
                        }
                        Err(e) => warn!("{}: {e}", path.display()),
                        Ok(_) => {}
                    }
                    // 接收方退出时没有必要继续
                    let _ = tx.blocking_send((path, result));
                });
            }
        });

        while let Some((path, result)) = rx.recv().await {
            let name = path.to_string_lossy().to_string();
            match result {
                Ok((hash, features)) => {
                    match self.add_features(&name, &hash, features).await? {
                        AddOutcome::Added(_) => report.added += 1,
                        AddOutcome::Updated(_) => report.updated += 1,
                    }
                    pb.set_message(name);
                }
                Err(_) => report.failed += 1,
            }
            pb.inc(1);
        }
        task.await?;

        pb.finish_with_message("图片添加完成");
        info!(
            "添加 {} 张图片，更新 {} 张，失败 {} 张",
            report.added, report.updated, report.failed
        );
        Ok(report)
    }

    /// 读取所有非空图片的描述符，返回按行连续存放的描述符及其维度
    async fn collect_descriptors(&self) -> Result<(Vec<f32>, usize)> {
        let records = crud::get_all_features(&self.db).await?;
        let mut data = vec![];
        let mut dim = None;
        for record in records.iter().filter(|r| r.count > 0) {
            let d = record.dim as usize;
            match dim {
                None => dim = Some(d),
                Some(expected) if expected != d => {
                    return Err(Error::DimensionMismatch { expected, actual: d });
                }
                _ => {}
            }
            data.extend(record.decode()?.descriptors());
        }
        match dim {
            Some(dim) => Ok((data, dim)),
            None => Err(Error::EmptyCorpus),
        }
    }

    /// 训练视觉词典
    ///
    /// 启用描述符降维时先拟合 PCA，再在降维后的描述符上聚类。
    /// 下游的 VLAD 向量和索引会被清除。
    pub async fn train_vocabulary<C>(&self, clusterer: C) -> Result<()>
    where
        C: Clusterer + Send + 'static,
    {
        let (data, dim) = self.collect_descriptors().await?;
        info!("共 {} 个 {dim} 维描述符", data.len() / dim);

        let reduction =
            self.config.use_descriptor_reduction.then_some(self.config.descriptor_components);
        let (vocab, pca) = spawn_blocking(move || -> Result<_> {
            let Some(components) = reduction else {
                return Ok((clusterer.train(&data, dim)?, None));
            };
            let n = data.len() / dim;
            let step = n.div_ceil(MAX_PCA_SAMPLES).max(1);
            let samples = data
                .chunks_exact(dim)
                .step_by(step)
                .flatten()
                .copied()
                .collect::<Vec<_>>();
            let pca = Pca::fit(&samples, dim, components)?;
            let mut reduced = Vec::with_capacity(n * pca.output_dim());
            for row in data.chunks_exact(dim) {
                reduced.extend(pca.transform(row)?);
            }
            Ok((clusterer.train(&reduced, pca.output_dim())?, Some(pca)))
        })
        .await??;

        self.invalidate_signatures().await?;
        match pca {
            Some(pca) => pca.save(self.conf_dir.descriptor_pca())?,
            None => remove_if_exists(&self.conf_dir.descriptor_pca())?,
        }
        vocab.save(self.conf_dir.vocabulary())?;
        info!("视觉词典已保存：{} 个中心，{} 维", vocab.len(), vocab.dim());
        Ok(())
    }

    /// 直接使用给定的视觉词典，词典位于原始描述符空间
    pub async fn set_vocabulary(&self, vocab: &CentroidVocabulary) -> Result<()> {
        self.invalidate_signatures().await?;
        remove_if_exists(&self.conf_dir.descriptor_pca())?;
        vocab.save(self.conf_dir.vocabulary())?;
        Ok(())
    }

    async fn invalidate_signatures(&self) -> Result<()> {
        crud::delete_signatures(&self.db).await?;
        remove_if_exists(&self.conf_dir.signature_pca())?;
        remove_if_exists(&self.conf_dir.index())
    }

    /// 为所有图片计算 VLAD 向量并覆盖旧的向量，索引需要重新构建
    pub async fn compute_signatures(&self) -> Result<SignatureReport> {
        let (vocabulary, descriptor_pca, _) = load_models(&self.conf_dir)?;
        let records = crud::get_all_features(&self.db).await?;
        let reduction =
            self.config.use_signature_reduction.then_some(self.config.signature_components);

        info!("计算 {} 张图片的 VLAD 向量", records.len());
        let (signatures, pca, skipped) = spawn_blocking(move || -> Result<_> {
            let pb = ProgressBar::new(records.len() as u64).with_style(pb_style());
            let results = records
                .par_iter()
                .progress_with(pb)
                .map(|record| {
                    let features = record.decode()?;
                    let features = match &descriptor_pca {
                        Some(pca) if !features.is_empty() => features.transform(pca)?,
                        _ => features,
                    };
                    match aggregate(&features, &vocabulary) {
                        Ok(v) => Ok(Some((record.id, v))),
                        Err(Error::EmptySignature) => {
                            debug!("图片 {} 没有有效的 VLAD 向量", record.id);
                            Ok(None)
                        }
                        Err(e) => Err(e),
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            let mut skipped = results.iter().filter(|r| r.is_none()).count();
            let signatures = results.into_iter().flatten().collect::<Vec<_>>();

            let Some(components) = reduction.filter(|_| !signatures.is_empty()) else {
                return Ok((signatures, None, skipped));
            };
            let dim = signatures[0].1.len();
            let data =
                signatures.iter().flat_map(|(_, v)| v.iter().copied()).collect::<Vec<_>>();
            let pca = Pca::fit(&data, dim, components)?;
            let mut reduced = Vec::with_capacity(signatures.len());
            for (id, v) in &signatures {
                match reduce_signature(&pca, v)? {
                    Some(y) => reduced.push((*id, y)),
                    None => skipped += 1,
                }
            }
            Ok((reduced, Some(pca), skipped))
        })
        .await??;

        if skipped > 0 {
            warn!("跳过 {skipped} 张没有有效 VLAD 向量的图片");
        }

        remove_if_exists(&self.conf_dir.index())?;
        match pca {
            Some(pca) => pca.save(self.conf_dir.signature_pca())?,
            None => remove_if_exists(&self.conf_dir.signature_pca())?,
        }
        let records = signatures
            .iter()
            .map(|(id, v)| SignatureRecord::encode(*id, v))
            .collect::<Vec<_>>();
        crud::replace_signatures(&self.db, &records).await?;

        let report = SignatureReport { computed: records.len(), skipped };
        info!("VLAD 向量计算完成：{} 张，跳过 {} 张", report.computed, report.skipped);
        Ok(report)
    }

    /// 使用已计算的 VLAD 向量构建索引，构建完成后替换正在使用的索引
    pub async fn build_index(&self, kind: IndexKind) -> Result<()> {
        let records = crud::get_signatures(&self.db).await?;
        if records.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        let conf_dir = self.conf_dir.clone();
        let searcher = spawn_blocking(move || -> Result<_> {
            let signatures = records.iter().map(|r| (r.id, r.decode())).collect();
            let index = SignatureIndex::build(signatures, kind)?;
            index.save(conf_dir.index())?;
            Searcher::load(&conf_dir)
        })
        .await??;
        self.swap(searcher).await;
        Ok(())
    }

    /// 从磁盘重新加载索引与模型
    pub async fn reload(&self) -> Result<()> {
        let conf_dir = self.conf_dir.clone();
        let searcher = spawn_blocking(move || Searcher::load(&conf_dir)).await??;
        self.swap(searcher).await;
        Ok(())
    }

    async fn swap(&self, searcher: Searcher) {
        info!("加载索引：{} 个 {} 维向量", searcher.index.len(), searcher.index.dim());
        if !searcher.index.is_exact() {
            info!("当前索引为近似索引，搜索结果可能不完整");
        }
        *self.searcher.write().await = Some(Arc::new(searcher));
    }

    pub async fn searcher(&self) -> Result<Arc<Searcher>> {
        self.searcher.read().await.clone().ok_or(Error::EmptyIndex)
    }

    /// 搜索一组查询特征点，返回通过几何校验的结果
    pub async fn query(
        &self,
        features: Features,
        search: &SearchOptions,
        verify: &VerifyOptions,
    ) -> Result<Vec<SearchResult>> {
        let deadline = search.timeout.map(|ms| Instant::now() + Duration::from_millis(ms));
        self.query_until(features, search, verify, deadline).await
    }

    pub async fn query_until(
        &self,
        features: Features,
        search: &SearchOptions,
        verify: &VerifyOptions,
        deadline: Option<Instant>,
    ) -> Result<Vec<SearchResult>> {
        let start = Instant::now();
        let Some(searcher) = self.searcher.read().await.clone() else {
            debug!("索引尚未构建，返回空结果");
            return Ok(vec![]);
        };
        metrics::inc_query_count(search.top_k);
        if features.is_empty() {
            debug!("查询图片没有特征点");
            return Ok(vec![]);
        }

        let features = Arc::new(features);
        let top_k = search.top_k;
        let neighbors = spawn_blocking({
            let features = features.clone();
            move || match searcher.signature(&features)? {
                Some(v) => searcher.index.search(&v, top_k),
                None => Ok(vec![]),
            }
        })
        .await??;
        debug!("近邻搜索耗时：{:.2}ms", start.elapsed().as_secs_f32() * 1000.);
        if neighbors.is_empty() {
            return Ok(vec![]);
        }

        let mut candidates = Vec::with_capacity(neighbors.len());
        for n in &neighbors {
            match crud::get_features(&self.db, n.id).await? {
                Some(record) => {
                    candidates.push(Candidate { image_id: n.id, features: record.decode()? })
                }
                None => warn!("图片 {} 不在数据库中", n.id),
            }
        }

        let verifier = Verifier::new(verify.clone());
        let verified = spawn_blocking(move || match deadline {
            Some(deadline) => verifier.verify_until(&features, &candidates, deadline),
            None => verifier.verify(&features, &candidates),
        })
        .await??;

        let count = search.count.unwrap_or(verified.len());
        let mut results = Vec::with_capacity(verified.len().min(count));
        for v in verified.into_iter().take(count) {
            let distance = neighbors
                .iter()
                .find(|n| n.id == v.image_id)
                .map(|n| n.distance)
                .unwrap_or(f32::NAN);
            let path = self.image_path(v.image_id).await?.unwrap_or_default();
            results.push(SearchResult { id: v.image_id, path, score: v.score, distance });
        }

        let elapsed = start.elapsed();
        debug!("搜索耗时：{:.2}ms", elapsed.as_secs_f32() * 1000.);
        metrics::observe_query_duration(search.top_k, elapsed.as_secs_f64());
        metrics::observe_query_max_score(search.top_k, results.first().map_or(0, |r| r.score));
        Ok(results)
    }

    /// 提取图片特征点后搜索
    pub async fn search_image(
        &self,
        bytes: Vec<u8>,
        extractor: Arc<dyn Extractor>,
        search: &SearchOptions,
        verify: &VerifyOptions,
    ) -> Result<Vec<SearchResult>> {
        let features = spawn_blocking(move || extractor.extract(&bytes)).await??;
        self.query(features, search, verify).await
    }

    /// 导出所有 VLAD 向量为 N x dim 的矩阵，行顺序与返回的图片 ID 一致
    pub async fn export_signatures(&self) -> Result<(Vec<ImageId>, Array2<f32>)> {
        let records = crud::get_signatures(&self.db).await?;
        let ids = records.iter().map(|r| r.id).collect::<Vec<_>>();
        let rows = records.iter().map(SignatureRecord::decode).collect::<Vec<_>>();
        let dim = rows.first().map_or(0, Vec::len);
        if let Some(row) = rows.iter().find(|r| r.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: row.len() });
        }
        let data = rows.into_iter().flatten().collect::<Vec<_>>();
        let arr = Array2::from_shape_vec((ids.len(), dim), data)
            .map_err(|e| Error::index(format!("导出失败: {e}")))?;
        Ok((ids, arr))
    }
}

/// 找出无法提取特征点的图片，不修改任何文件
pub fn validate_corpus(corpus: &Path, suffix: &Regex, extractor: &dyn Extractor) -> Vec<PathBuf> {
    let entries = scan_images(corpus, suffix);
    let pb = ProgressBar::new(entries.len() as u64).with_style(pb_style());
    let mut unreadable = entries
        .into_par_iter()
        .progress_with(pb)
        .filter(|path| match extractor.extract_file(path) {
            Ok(_) => false,
            Err(e) => {
                debug!("{}: {e}", path.display());
                true
            }
        })
        .collect::<Vec<_>>();
    unreadable.sort();
    unreadable
}

/// 删除给定的图片文件，返回实际删除的数量
pub fn remove_files(paths: &[PathBuf]) -> Result<usize> {
    let mut removed = 0;
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {
                info!("删除图片: {}", path.display());
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(removed)
}
