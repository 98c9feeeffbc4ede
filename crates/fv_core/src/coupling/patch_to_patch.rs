// crates/fv_core/src/coupling/patch_to_patch.rs

//! 补丁间耦合
//!
//! [`PatchToPatch::update`] 建立源面与目标面之间的加权耦合，之后
//! [`PatchToPatch::src_to_tgt`] / [`PatchToPatch::tgt_to_src`] 在两侧之间
//! 插值面值。
//!
//! 两侧面都只在同一个 rank 上时走单进程路径，不做任何分布。
//! 否则：
//!
//! 1. 收集每个 rank 源面的包围盒
//! 2. 目标面发往包围盒与之重叠的 rank，各 rank 拼成“分布目标面”
//! 3. 本地求交
//! 4. 目标侧耦合结果反向分布回目标面所在 rank
//! 5. 目标面所在 rank 向源面所在 rank 请求所需源面，建立源值分布映射
//!
//! 插值时权重之和为零的面得到 NaN（未给出缺省值时）；权重之和不足 1
//! 时按和归一，给出缺省值时以 (1 − Σw) 补足；权重之和超过 1 时先归一。

use super::methods::PatchToPatchMethod;
use crate::parallel::{Communicator, CommunicatorExt, DistributionMap};
use fv_foundation::{FieldValue, FvError, FvResult};
use fv_mesh::{BoundBox, PrimitivePatch};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 处理器包围盒外扩比例
const PROC_BOX_INFLATION: f64 = 1e-3;

/// 补丁间耦合
#[derive(Clone)]
pub struct PatchToPatch {
    method: Arc<dyn PatchToPatchMethod>,
    reverse: bool,
    /// 两侧面所在的唯一 rank
    single_process: Option<usize>,

    n_src: usize,
    n_tgt: usize,

    /// 源面耦合的目标面（单进程为本地目标面，否则为分布目标面）
    src_local_tgt_faces: Vec<Vec<usize>>,
    src_weights: Vec<Vec<f64>>,
    /// 目标面耦合的源面（单进程为本地源面，否则为源值分布后的位置）
    tgt_local_src_faces: Vec<Vec<usize>>,
    tgt_weights: Vec<Vec<f64>>,

    /// 本地目标值到分布目标面
    tgt_map: Option<DistributionMap>,
    /// 本地源值到目标侧
    src_map: Option<DistributionMap>,

    src_tgt_proc_faces: Vec<Vec<(usize, usize)>>,
    tgt_src_proc_faces: Vec<Vec<(usize, usize)>>,
}

impl fmt::Debug for PatchToPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchToPatch")
            .field("method", &self.method.type_name())
            .field("reverse", &self.reverse)
            .field("single_process", &self.single_process)
            .field("n_src", &self.n_src)
            .field("n_tgt", &self.n_tgt)
            .finish()
    }
}

impl PatchToPatch {
    /// 创建尚未求交的耦合
    pub fn new(method: Arc<dyn PatchToPatchMethod>, reverse: bool) -> Self {
        Self {
            method,
            reverse,
            single_process: None,
            n_src: 0,
            n_tgt: 0,
            src_local_tgt_faces: Vec::new(),
            src_weights: Vec::new(),
            tgt_local_src_faces: Vec::new(),
            tgt_weights: Vec::new(),
            tgt_map: None,
            src_map: None,
            src_tgt_proc_faces: Vec::new(),
            tgt_src_proc_faces: Vec::new(),
        }
    }

    /// 方法名
    pub fn method_name(&self) -> &'static str {
        self.method.type_name()
    }

    #[inline]
    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// 两侧面所在的唯一 rank
    #[inline]
    pub fn single_process(&self) -> Option<usize> {
        self.single_process
    }

    /// 建立耦合；所有 rank 必须同时调用
    pub fn update(
        &mut self,
        src: &PrimitivePatch,
        tgt: &PrimitivePatch,
        comm: &dyn Communicator,
    ) -> FvResult<()> {
        self.n_src = src.len();
        self.n_tgt = tgt.len();

        let sizes: Vec<(usize, usize)> = if comm.is_serial() {
            vec![(src.len(), tgt.len())]
        } else {
            comm.all_gather(&(src.len(), tgt.len()))?
        };
        let owners: Vec<usize> = sizes
            .iter()
            .enumerate()
            .filter(|(_, st)| st.0 + st.1 > 0)
            .map(|(p, _)| p)
            .collect();

        if owners.len() <= 1 {
            let rank = owners.first().copied().unwrap_or(comm.rank());
            self.update_single_process(src, tgt, comm.rank(), rank)?;
        } else {
            self.update_distributed(src, tgt, comm)?;
        }

        let n_coupled = self.src_coupled().iter().filter(|&&c| c).count();
        tracing::debug!(
            method = self.method_name(),
            n_src = self.n_src,
            n_tgt = self.n_tgt,
            n_coupled,
            single_process = ?self.single_process,
            "补丁耦合已更新"
        );
        Ok(())
    }

    fn update_single_process(
        &mut self,
        src: &PrimitivePatch,
        tgt: &PrimitivePatch,
        my_rank: usize,
        owner: usize,
    ) -> FvResult<()> {
        let local = self.method.intersect(src, tgt, self.reverse)?;
        let (src_faces, src_weights) = split(&local.src_tgt);
        let (tgt_faces, tgt_weights) = split(&local.tgt_src);

        self.src_tgt_proc_faces = proc_faces(&src_faces, |j| (my_rank, j));
        self.tgt_src_proc_faces = proc_faces(&tgt_faces, |i| (my_rank, i));
        self.src_local_tgt_faces = src_faces;
        self.src_weights = src_weights;
        self.tgt_local_src_faces = tgt_faces;
        self.tgt_weights = tgt_weights;
        self.single_process = Some(owner);
        self.tgt_map = None;
        self.src_map = None;
        Ok(())
    }

    fn update_distributed(
        &mut self,
        src: &PrimitivePatch,
        tgt: &PrimitivePatch,
        comm: &dyn Communicator,
    ) -> FvResult<()> {
        let n_procs = comm.size();
        let my_rank = comm.rank();

        // 1. 处理器包围盒
        let proc_boxes: Vec<BoundBox> = comm.all_gather(&src.bounds().inflate(PROC_BOX_INFLATION))?;

        // 2. 分发目标面
        let tgt_bounds = tgt.face_bounds();
        let send_faces: Vec<Vec<usize>> = proc_boxes
            .iter()
            .map(|pb| {
                (0..tgt.len())
                    .filter(|&j| pb.overlaps(&tgt_bounds[j]))
                    .collect()
            })
            .collect();
        let tgt_map = DistributionMap::from_send_lists(comm, send_faces.clone())?;

        let labelled = PrimitivePatch::with_labels(
            tgt.points().to_vec(),
            tgt.faces().to_vec(),
            (0..tgt.len()).collect(),
        );
        let pieces: Vec<PrimitivePatch> = send_faces.iter().map(|f| labelled.subset(f)).collect();
        let received: Vec<PrimitivePatch> = comm.all_to_all(&pieces[..])?;
        let (dist_tgt, dist_origin) = merge_pieces(&received);
        FvError::check_size("distributed target faces", tgt_map.construct_size(), dist_tgt.len())?;

        // 3. 本地求交
        let local = self.method.intersect(src, &dist_tgt, self.reverse)?;
        let (src_faces, src_weights) = split(&local.src_tgt);
        self.src_tgt_proc_faces = proc_faces(&src_faces, |k| dist_origin[k]);

        // 4. 目标侧结果送回目标面所在 rank
        let dist_tgt_src: Vec<Vec<(usize, usize, f64)>> = local
            .tgt_src
            .iter()
            .map(|l| l.iter().map(|&(i, w)| (my_rank, i, w)).collect())
            .collect();
        let tgt_src_remote = tgt_map.reverse_distribute(
            comm,
            &dist_tgt_src,
            tgt.len(),
            Vec::new(),
            |acc, mut v| acc.append(&mut v),
        )?;

        // 5. 请求源面值
        let mut needed: Vec<BTreeMap<usize, usize>> = vec![BTreeMap::new(); n_procs];
        for list in &tgt_src_remote {
            for &(p, i, _) in list {
                needed[p].insert(i, 0);
            }
        }
        let mut next = 0;
        let mut construct_map = Vec::with_capacity(n_procs);
        let mut requests = Vec::with_capacity(n_procs);
        for faces in needed.iter_mut() {
            let mut slots = Vec::with_capacity(faces.len());
            let mut req = Vec::with_capacity(faces.len());
            for (&face, slot) in faces.iter_mut() {
                *slot = next;
                slots.push(next);
                req.push(face);
                next += 1;
            }
            construct_map.push(slots);
            requests.push(req);
        }
        let sub_map: Vec<Vec<usize>> = comm.all_to_all(&requests[..])?;
        let src_map = DistributionMap::new(next, sub_map, construct_map)?;

        let mut tgt_faces = Vec::with_capacity(tgt.len());
        let mut tgt_weights = Vec::with_capacity(tgt.len());
        let mut tgt_proc = Vec::with_capacity(tgt.len());
        for mut list in tgt_src_remote {
            list.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
            tgt_faces.push(list.iter().map(|&(p, i, _)| needed[p][&i]).collect());
            tgt_weights.push(list.iter().map(|&(_, _, w)| w).collect());
            tgt_proc.push(list.iter().map(|&(p, i, _)| (p, i)).collect());
        }

        self.src_local_tgt_faces = src_faces;
        self.src_weights = src_weights;
        self.tgt_local_src_faces = tgt_faces;
        self.tgt_weights = tgt_weights;
        self.tgt_src_proc_faces = tgt_proc;
        self.tgt_map = Some(tgt_map);
        self.src_map = Some(src_map);
        self.single_process = None;
        Ok(())
    }

    // =========================================================================
    // 查询
    // =========================================================================

    /// 每个源面是否有耦合
    pub fn src_coupled(&self) -> Vec<bool> {
        self.src_local_tgt_faces.iter().map(|l| !l.is_empty()).collect()
    }

    /// 每个目标面是否有耦合
    pub fn tgt_coupled(&self) -> Vec<bool> {
        self.tgt_local_src_faces.iter().map(|l| !l.is_empty()).collect()
    }

    /// 源面耦合的 (rank, 目标面)
    pub fn src_tgt_proc_faces(&self) -> &[Vec<(usize, usize)>] {
        &self.src_tgt_proc_faces
    }

    /// 目标面耦合的 (rank, 源面)
    pub fn tgt_src_proc_faces(&self) -> &[Vec<(usize, usize)>] {
        &self.tgt_src_proc_faces
    }

    /// 源面权重
    pub fn src_weights(&self) -> &[Vec<f64>] {
        &self.src_weights
    }

    /// 目标面权重
    pub fn tgt_weights(&self) -> &[Vec<f64>] {
        &self.tgt_weights
    }

    /// 每个源面的权重和
    pub fn src_weight_sums(&self) -> Vec<f64> {
        self.src_weights.iter().map(|w| w.iter().sum()).collect()
    }

    /// 每个目标面的权重和
    pub fn tgt_weight_sums(&self) -> Vec<f64> {
        self.tgt_weights.iter().map(|w| w.iter().sum()).collect()
    }

    // =========================================================================
    // 插值
    // =========================================================================

    /// 源面值插值到目标面
    pub fn src_to_tgt<T: FieldValue>(
        &self,
        src_field: &[T],
        left_over: Option<&[T]>,
        comm: &dyn Communicator,
    ) -> FvResult<Vec<T>> {
        FvError::check_size("source field", self.n_src, src_field.len())?;
        let values = match &self.src_map {
            Some(map) => map.distribute(comm, src_field)?,
            None => src_field.to_vec(),
        };
        weighted_sum(
            &self.tgt_local_src_faces,
            &self.tgt_weights,
            &values,
            left_over,
        )
    }

    /// 目标面值插值到源面
    pub fn tgt_to_src<T: FieldValue>(
        &self,
        tgt_field: &[T],
        left_over: Option<&[T]>,
        comm: &dyn Communicator,
    ) -> FvResult<Vec<T>> {
        FvError::check_size("target field", self.n_tgt, tgt_field.len())?;
        let values = match &self.tgt_map {
            Some(map) => map.distribute(comm, tgt_field)?,
            None => tgt_field.to_vec(),
        };
        weighted_sum(
            &self.src_local_tgt_faces,
            &self.src_weights,
            &values,
            left_over,
        )
    }
}

fn split(lists: &[Vec<(usize, f64)>]) -> (Vec<Vec<usize>>, Vec<Vec<f64>>) {
    lists
        .iter()
        .map(|l| l.iter().copied().unzip::<usize, f64, Vec<_>, Vec<_>>())
        .unzip()
}

fn proc_faces<F: Fn(usize) -> (usize, usize)>(
    faces: &[Vec<usize>],
    origin: F,
) -> Vec<Vec<(usize, usize)>> {
    faces
        .iter()
        .map(|l| l.iter().map(|&k| origin(k)).collect())
        .collect()
}

/// 按 rank 顺序拼接收到的目标面，返回拼接结果与每个面的 (rank, 本地面)
fn merge_pieces(pieces: &[PrimitivePatch]) -> (PrimitivePatch, Vec<(usize, usize)>) {
    let mut points = Vec::new();
    let mut faces = Vec::new();
    let mut labels = Vec::new();
    let mut origin = Vec::new();
    for (proc, piece) in pieces.iter().enumerate() {
        let offset = points.len();
        points.extend_from_slice(piece.points());
        for (face, &label) in piece.faces().iter().zip(piece.face_labels()) {
            faces.push(face.iter().map(|&p| p + offset).collect());
            labels.push(label);
            origin.push((proc, label));
        }
    }
    (PrimitivePatch::with_labels(points, faces, labels), origin)
}

fn weighted_sum<T: FieldValue>(
    faces: &[Vec<usize>],
    weights: &[Vec<f64>],
    values: &[T],
    left_over: Option<&[T]>,
) -> FvResult<Vec<T>> {
    if let Some(lo) = left_over {
        FvError::check_size("left-over values", faces.len(), lo.len())?;
    }
    Ok(faces
        .iter()
        .zip(weights)
        .enumerate()
        .map(|(f, (idx, w))| {
            let sum_w: f64 = w.iter().sum();
            let mut value = idx
                .iter()
                .zip(w)
                .fold(T::zero(), |acc, (&k, &wk)| acc + values[k] * wk);
            let mut covered = sum_w;
            if sum_w > 1.0 {
                value = value * (1.0 / sum_w);
                covered = 1.0;
            }
            match left_over {
                Some(lo) => value + lo[f] * (1.0 - covered),
                None if covered > 0.0 => value * (1.0 / covered),
                None => T::nan(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::methods::{IntersectionMethod, NearestMethod};
    use crate::parallel::{run_threaded, SerialCommunicator};
    use fv_foundation::Vector;
    use fv_mesh::generation::unit_square_patch;

    fn intersection() -> PatchToPatch {
        PatchToPatch::new(Arc::new(IntersectionMethod::default()), false)
    }

    #[test]
    fn test_single_process_identity_for_identical_patches() {
        let p = unit_square_patch(3, 2);
        let mut ptp = intersection();
        ptp.update(&p, &p, &SerialCommunicator).unwrap();
        assert_eq!(ptp.single_process(), Some(0));
        let field: Vec<f64> = (0..p.len()).map(|i| i as f64 * 1.5 - 2.0).collect();
        let mapped = ptp.src_to_tgt(&field, None, &SerialCommunicator).unwrap();
        for (a, b) in mapped.iter().zip(&field) {
            assert!((a - b).abs() < 1e-12);
        }
        let back = ptp.tgt_to_src(&mapped, None, &SerialCommunicator).unwrap();
        for (a, b) in back.iter().zip(&field) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_uncoupled_faces_nan_or_left_over() {
        let src = unit_square_patch(2, 2);
        let tgt = unit_square_patch(2, 2).translated(Vector::new(0.5, 0.0, 0.0));
        let mut ptp = intersection();
        ptp.update(&src, &tgt, &SerialCommunicator).unwrap();
        let ones = vec![1.0; 4];
        let mapped = ptp.src_to_tgt(&ones, None, &SerialCommunicator).unwrap();
        // 目标右列（x ∈ [1, 1.5]）无覆盖
        assert!(mapped[1].is_nan() && mapped[3].is_nan());
        assert!((mapped[0] - 1.0).abs() < 1e-12);
        let lo = vec![7.0; 4];
        let with_lo = ptp.src_to_tgt(&ones, Some(&lo), &SerialCommunicator).unwrap();
        assert_eq!(with_lo[1], 7.0);
        assert!((with_lo[0] - 1.0).abs() < 1e-12);
        assert_eq!(ptp.tgt_coupled(), vec![true, false, true, false]);
    }

    #[test]
    fn test_conservative_transfer() {
        // Σ 源值·源面积 = Σ 目标值·目标面积（全覆盖时）
        let src = unit_square_patch(3, 3);
        let tgt = unit_square_patch(5, 2);
        let mut ptp = intersection();
        ptp.update(&src, &tgt, &SerialCommunicator).unwrap();
        let field: Vec<f64> = src.face_centres().iter().map(|c| c.x + 2.0 * c.y).collect();
        let mapped = ptp.src_to_tgt(&field, None, &SerialCommunicator).unwrap();
        let total_src: f64 = field.iter().zip(src.mag_face_areas()).map(|(v, a)| v * a).sum();
        let total_tgt: f64 = mapped.iter().zip(tgt.mag_face_areas()).map(|(v, a)| v * a).sum();
        assert!((total_src - total_tgt).abs() < 1e-10);
    }

    #[test]
    fn test_distributed_matches_serial() {
        let src = unit_square_patch(4, 4);
        let tgt = unit_square_patch(3, 3);
        let field: Vec<f64> = src.face_centres().iter().map(|c| c.x - c.y * c.y).collect();

        let mut serial = intersection();
        serial.update(&src, &tgt, &SerialCommunicator).unwrap();
        let expected = serial.src_to_tgt(&field, None, &SerialCommunicator).unwrap();

        // rank 0 持有源面左半与目标面，rank 1 持有源面右半
        let left: Vec<usize> = (0..src.len()).filter(|&i| i % 4 < 2).collect();
        let right: Vec<usize> = (0..src.len()).filter(|&i| i % 4 >= 2).collect();
        let results = run_threaded(2, |comm| {
            let (my_src, my_faces) = if comm.rank() == 0 {
                (src.subset(&left), left.clone())
            } else {
                (src.subset(&right), right.clone())
            };
            let my_tgt = if comm.rank() == 0 {
                tgt.clone()
            } else {
                PrimitivePatch::default()
            };
            let my_field: Vec<f64> = my_faces.iter().map(|&i| field[i]).collect();
            let mut ptp = intersection();
            ptp.update(&my_src, &my_tgt, comm)?;
            ptp.src_to_tgt(&my_field, None, comm)
        });
        let mut results = results.into_iter();
        let rank0 = results.next().unwrap().unwrap();
        let rank1 = results.next().unwrap().unwrap();
        assert!(rank1.is_empty());
        for (a, b) in rank0.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_nearest_method() {
        let p = unit_square_patch(2, 1);
        let mut ptp = PatchToPatch::new(Arc::new(NearestMethod), false);
        ptp.update(&p, &p, &SerialCommunicator).unwrap();
        let mapped = ptp.src_to_tgt(&[3.0, 4.0], None, &SerialCommunicator).unwrap();
        assert_eq!(mapped, vec![3.0, 4.0]);
    }
}
