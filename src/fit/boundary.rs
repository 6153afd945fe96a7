//! Region-boundary resolution for the piecewise profile.
//!
//! Starting from the peaks and shape inputs, the resolver finds:
//!
//! - HMF1, where the F2 bottomside plus F1 correction reaches NmF1
//! - HST, where the same curve comes down to NmE, and from it HZ and T
//!
//! Searches that fail degrade the profile step by step:
//!
//! 1. relax the bottomside exponent B1 in steps of 0.5 up to 5.0
//! 2. drop the F1 region (F1 search failed at every B1)
//! 3. use a linear transition between HEF and HZ (valley search failed)
//!
//! The sequence is an explicit state machine with a bounded number of
//! transitions, and every degradation is recorded as a [`ResolutionEvent`].

use crate::domain::{
    BottomsideShape, BoundaryHeights, LINEAR_TRANSITION_HST, PeakSet, ProfileContext,
    ResolutionEvent, ShapeInputs, ValleyInputs,
};
use crate::fit::valley::shape_valley;
use crate::math::find_root;
use crate::models::piecewise::{d_region_shape, f1_layer, f2_bottomside};

/// Initial bottomside exponent.
pub const B1_START: f64 = 3.0;
/// Increment applied per relaxation.
pub const B1_STEP: f64 = 0.5;
/// B1 is relaxed only while it does not exceed this value (so 5.0 is the last tried).
pub const B1_RELAX_LIMIT: f64 = 4.5;
/// Bracket-width tolerance of the HMF1 and HST root searches (km).
pub const HEIGHT_TOLERANCE: f64 = 0.001;
/// Margin (m⁻³) by which the linear transition's HZ density must exceed NmE.
pub const LINEAR_DENSITY_TOLERANCE: f64 = 0.001;
/// Below this `min N / NmE` a failed valley search relaxes B1 instead of going linear.
pub const VALLEY_RELAX_RATIO: f64 = 1.3;

const SCAN_STEP: f64 = 10.0;
const MIN_SCAN_STEP: f64 = 1.0;
const MAX_TRANSITIONS: usize = 64;

/// Outcome of [`resolve_boundaries`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub context: ProfileContext,
    pub events: Vec<ResolutionEvent>,
}

/// What the downward scan from the F1 floor saw before it gave up.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScanMiss {
    /// Upper end of the scan (km).
    top: f64,
    /// Lowest density seen and where.
    min_density: f64,
    min_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    F1Search,
    ValleySearch(ScanMiss),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    SearchF1,
    RelaxB1(Failure),
    DropF1,
    SearchValley,
    LinearFallback(ScanMiss),
    Done,
}

struct Resolver<'a> {
    ctx: ProfileContext,
    shape: &'a ShapeInputs,
    events: Vec<ResolutionEvent>,
}

/// Resolve all region boundaries for one request.
///
/// Expects validated inputs (`HME < HMF2`, `0 < NmE < NmF2`, positive B0).
pub fn resolve_boundaries(peaks: &PeakSet, shape: &ShapeInputs, valley: &ValleyInputs) -> Resolution {
    let mut events = Vec::new();
    let (valley_shape, spurious) = shape_valley(valley, peaks.nme);
    if spurious {
        log::warn!("{}", ResolutionEvent::SpuriousValleyExtremum);
        events.push(ResolutionEvent::SpuriousValleyExtremum);
    }

    let has_f1 = peaks.has_f1();
    let mut initial = *peaks;
    if !has_f1 {
        initial.hmf1 = 0.0;
        initial.nmf1 = 0.0;
    }
    let hef = peaks.hme + valley_shape.width;
    let ctx = ProfileContext {
        peaks: initial,
        bottomside: BottomsideShape {
            b0: shape.thickness.b0_for(B1_START),
            b1: B1_START,
            c1: if has_f1 { shape.c1 } else { 0.0 },
        },
        topside: shape.topside,
        valley: valley_shape,
        boundaries: BoundaryHeights { hef, hz: peaks.hmf2, hst: LINEAR_TRANSITION_HST, t: 0.0, d: 0.0 },
        d_region: d_region_shape(peaks, &shape.d_region),
        night: shape.night,
    };

    let mut resolver = Resolver { ctx, shape, events };
    resolver.run();
    Resolution { context: resolver.ctx, events: resolver.events }
}

impl Resolver<'_> {
    fn run(&mut self) {
        let mut state = State::SearchF1;
        for _ in 0..MAX_TRANSITIONS {
            state = match state {
                State::SearchF1 => self.search_f1(),
                State::RelaxB1(failure) => self.relax_b1(failure),
                State::DropF1 => self.drop_f1(),
                State::SearchValley => self.search_valley(),
                State::LinearFallback(miss) => self.linear_fallback(miss),
                State::Done => return,
            };
        }
        if state != State::Done {
            log::error!("boundary resolution did not settle, using linear transition");
            let top = self.ctx.f1_floor().max(self.ctx.boundaries.hef);
            let hef = self.ctx.boundaries.hef;
            self.linear_fallback(ScanMiss { top, min_density: self.ctx.peaks.nme, min_height: hef });
        }
    }

    fn record(&mut self, event: ResolutionEvent) {
        log::warn!("{event}");
        self.events.push(event);
    }

    fn search_f1(&mut self) -> State {
        if !self.ctx.peaks.has_f1() {
            return State::SearchValley;
        }
        let ctx = self.ctx;
        let (lo, hi) = (ctx.boundaries.hef, ctx.peaks.hmf2);
        let root = find_root(
            lo,
            hi,
            f2_bottomside(&ctx, lo),
            f2_bottomside(&ctx, hi),
            ctx.peaks.nmf1,
            HEIGHT_TOLERANCE,
            |h| f2_bottomside(&ctx, h),
        );
        match root {
            Some(h) => {
                log::debug!("F1 peak at {h:.2} km (B1={:.1})", ctx.bottomside.b1);
                self.ctx.peaks.hmf1 = h;
                State::SearchValley
            }
            None => {
                self.record(ResolutionEvent::F1RootMissing { b1: ctx.bottomside.b1 });
                State::RelaxB1(Failure::F1Search)
            }
        }
    }

    fn relax_b1(&mut self, failure: Failure) -> State {
        let b1 = self.ctx.bottomside.b1;
        if b1 > B1_RELAX_LIMIT {
            return match failure {
                Failure::F1Search => State::DropF1,
                Failure::ValleySearch(miss) => State::LinearFallback(miss),
            };
        }
        let next = b1 + B1_STEP;
        self.ctx.bottomside.b1 = next;
        self.ctx.bottomside.b0 = self.shape.thickness.b0_for(next);
        self.record(ResolutionEvent::B1Relaxed { from: b1, to: next });
        State::SearchF1
    }

    fn drop_f1(&mut self) -> State {
        self.record(ResolutionEvent::F1Removed);
        self.ctx.peaks.hmf1 = 0.0;
        self.ctx.peaks.nmf1 = 0.0;
        // B0 stays at its last relaxed value.
        self.ctx.bottomside.b1 = B1_START;
        self.ctx.bottomside.c1 = 0.0;
        State::SearchValley
    }

    /// Upper end of the NmE search and the density there.
    fn scan_top(&self) -> (f64, f64) {
        let ctx = &self.ctx;
        if ctx.peaks.has_f1() {
            return (ctx.peaks.hmf1, ctx.peaks.nmf1);
        }
        // Halfway between HEF and HMF2, moved up until the curve is above NmE.
        let (hef, hmf2) = (ctx.boundaries.hef, ctx.peaks.hmf2);
        let top = (0..=5)
            .map(|i| hef + (hmf2 - hef) * (0.5 + 0.1 * i as f64))
            .find(|&h| f1_layer(ctx, h) >= ctx.peaks.nme)
            .unwrap_or(hmf2);
        (top, f1_layer(ctx, top))
    }

    /// Scan down from the top for the first height below NmE, then bracket HST.
    fn scan_for_hst(&self) -> Result<(f64, f64), ScanMiss> {
        let ctx = self.ctx;
        let (top, top_density) = self.scan_top();
        let hef = ctx.boundaries.hef;
        let nme = ctx.peaks.nme;

        let mut miss = ScanMiss { top, min_density: top_density, min_height: top };
        let mut h = top;
        let mut step = SCAN_STEP;
        loop {
            h -= step;
            if h < hef {
                h += 2.0 * step;
                step /= 10.0;
                if step < MIN_SCAN_STEP {
                    return Err(miss);
                }
            }
            let density = f1_layer(&ctx, h);
            if density < miss.min_density {
                miss.min_density = density;
                miss.min_height = h;
            }
            if density > nme {
                continue;
            }
            return find_root(h, top, density, top_density, nme, HEIGHT_TOLERANCE, |x| f1_layer(&ctx, x))
                .map(|hst| (hst, top))
                .ok_or(miss);
        }
    }

    fn search_valley(&mut self) -> State {
        match self.scan_for_hst() {
            Ok((hst, top)) => {
                let hz = (hst + top) / 2.0;
                let d = hz - hst;
                let t = d * d / (hz - self.ctx.boundaries.hef - d);
                if !t.is_finite() {
                    let hef = self.ctx.boundaries.hef;
                    return State::LinearFallback(ScanMiss { top, min_density: self.ctx.peaks.nme, min_height: hef });
                }
                log::debug!("HST={hst:.2} km HZ={hz:.2} km");
                let bd = &mut self.ctx.boundaries;
                bd.hst = hst;
                bd.hz = hz;
                bd.d = d;
                bd.t = t;
                State::Done
            }
            Err(miss) => {
                let ratio = miss.min_density / self.ctx.peaks.nme;
                self.record(ResolutionEvent::ValleyRootMissing { min_ratio: ratio });
                if ratio < VALLEY_RELAX_RATIO {
                    State::RelaxB1(Failure::ValleySearch(miss))
                } else {
                    State::LinearFallback(miss)
                }
            }
        }
    }

    fn linear_fallback(&mut self, miss: ScanMiss) -> State {
        let ctx = self.ctx;
        let (hef, nme) = (ctx.boundaries.hef, ctx.peaks.nme);

        let hz = (0..=5)
            .map(|i| miss.min_height + (miss.top - miss.min_height) * (0.5 + 0.1 * i as f64))
            .find(|&h| f1_layer(&ctx, h) - nme >= LINEAR_DENSITY_TOLERANCE)
            .unwrap_or(miss.top);
        let density = f1_layer(&ctx, hz);
        let slope = (density - nme) / (hz - hef);

        self.record(ResolutionEvent::LinearTransition { hz, hef });
        self.ctx.boundaries = BoundaryHeights {
            hef,
            hz,
            hst: LINEAR_TRANSITION_HST,
            t: if slope.is_finite() { slope } else { 0.0 },
            d: 0.0,
        };
        State::Done
    }
}
