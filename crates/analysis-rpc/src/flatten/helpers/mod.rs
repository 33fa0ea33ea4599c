//! Built-in flattening helpers.

mod arrays;
mod bean;
mod collections;
mod dataset;
mod exception;
mod identifier;
mod none;
mod scalar;
mod self_flattening;

pub use arrays::{ObjectArrayHelper, PrimitiveArrayHelper};
pub use bean::BeanHelper;
pub use collections::{ListHelper, MapHelper};
pub use dataset::DatasetDescriptorHelper;
pub use exception::ExceptionHelper;
pub use identifier::UuidHelper;
pub use none::NoneHelper;
pub use scalar::PassThroughHelper;
pub use self_flattening::SelfFlatteningHelper;

use super::Flattener;
use crate::beans::{
    AxisMapBean, Bean, CircularRoi, DataBean, DataSetWithAxisInformation, Dataset, GuiBean,
    GuiParameters, GuiPlotMode, LinearRoi, LinearRoiList, RectangularRoi, RectangularRoiList,
    RoiBase, SectorRoi, SectorRoiList,
};
use crate::value::Prim;
use std::sync::Arc;

fn bean<B: Bean>() -> Arc<dyn Flattener> {
    Arc::new(BeanHelper::<B>::new())
}

/// The default helper chain, in lookup order.
///
/// Self-describing objects come first, then nulls, domain beans, generic
/// collections, arrays, and finally the scalar pass-through.
pub fn builtin() -> Vec<Arc<dyn Flattener>> {
    let mut helpers: Vec<Arc<dyn Flattener>> = vec![
        Arc::new(SelfFlatteningHelper),
        Arc::new(NoneHelper),
        bean::<DataBean>(),
        bean::<DataSetWithAxisInformation>(),
        bean::<GuiBean>(),
        bean::<SectorRoi>(),
        bean::<LinearRoi>(),
        bean::<RectangularRoi>(),
        bean::<CircularRoi>(),
        bean::<RoiBase>(),
        bean::<GuiParameters>(),
        bean::<GuiPlotMode>(),
        bean::<RectangularRoiList>(),
        bean::<SectorRoiList>(),
        bean::<LinearRoiList>(),
        bean::<AxisMapBean>(),
        bean::<Dataset>(),
        Arc::new(DatasetDescriptorHelper),
        Arc::new(UuidHelper),
        Arc::new(ExceptionHelper),
        Arc::new(ListHelper),
        Arc::new(MapHelper),
    ];
    helpers.extend(
        Prim::ALL
            .into_iter()
            .map(|p| Arc::new(PrimitiveArrayHelper::new(p)) as Arc<dyn Flattener>),
    );
    helpers.push(Arc::new(ObjectArrayHelper));
    helpers.push(Arc::new(PassThroughHelper));
    helpers
}
